//! Per-instance stack: database, its network plumbing, and the media bucket.

use mstdn_template::{Mapping, SectionBuilder, Value};

use crate::error::StackResult;
use crate::identity::resource_name;
use crate::stack::{declare, get_att, output, reference, StackBuilder, StackInputs, StackKind};

pub const DB_SECURITY_GROUP: &str = "DBSecurityGroup";
pub const DB_SUBNET_GROUP: &str = "DBSubnetGroup";
pub const DB_INSTANCE: &str = "DBInstance";
pub const MEDIA_BUCKET: &str = "MediaBucket";

/// Output keys registered after a db stack deployment.
pub const OUTPUT_MEDIA_BUCKET: &str = "MediaBucket";
pub const OUTPUT_DB_ENDPOINT: &str = "DBEndPoint";
pub const OUTPUT_DB_SECURITY_GROUP: &str = "DBSecurityGroup";

pub const DB_PORT: u16 = 5432;
pub const CACHE_PORT: u16 = 6379;

const DB_ENGINE: &str = "postgres";
const DB_NAME: &str = "mstdn";

/// Database stack builder.
pub struct DbStack<'a> {
    inputs: StackInputs<'a>,
}

impl<'a> DbStack<'a> {
    pub fn new(inputs: StackInputs<'a>) -> Self {
        Self { inputs }
    }

    fn db_security_group(&self, p: &mut SectionBuilder<'_>) {
        p.set(
            "GroupDescription",
            format!("DB security group for mastodon {}", self.resource_name()),
        );
        if let Some(vpc_id) = &self.inputs.network.vpc_id {
            p.set("VpcId", vpc_id);
        }
        p.set("SecurityGroupIngress", ingress_rules(&self.inputs.network.subnet_cidrs));
    }

    fn db_subnet_group(&self, p: &mut SectionBuilder<'_>) {
        p.set(
            "DBSubnetGroupDescription",
            format!("db subnet group for mastodon {}", self.resource_name()),
        )
        .set("SubnetIds", self.inputs.network.subnet_ids.clone());
    }

    fn db_instance(&self, p: &mut SectionBuilder<'_>) {
        let db = &self.inputs.config.db;
        p.set("AllocatedStorage", db.allocated_storage)
            .set("AllowMajorVersionUpgrade", true)
            .set("AutoMinorVersionUpgrade", true)
            .set("Engine", DB_ENGINE)
            .set("DBInstanceClass", &db.instance_class)
            .set("DBInstanceIdentifier", self.resource_name())
            .set("DBName", DB_NAME)
            .set("MasterUsername", &db.user)
            .set("MasterUserPassword", &db.password)
            .set("MultiAZ", db.multi_az)
            .set("VPCSecurityGroups", vec![reference(DB_SECURITY_GROUP)])
            .set("DBSubnetGroupName", reference(DB_SUBNET_GROUP))
            .set("StorageType", &db.storage_type);
    }
}

impl StackBuilder for DbStack<'_> {
    fn kind(&self) -> StackKind {
        StackKind::Db
    }

    fn resource_name(&self) -> String {
        resource_name(self.inputs.identity, Some("db"))
    }

    fn check_prerequisites(&self) -> StackResult<()> {
        self.inputs.config.validate_db()?;
        self.inputs.network.require_subnet_ids()?;
        self.inputs.network.require_subnet_cidrs()?;
        Ok(())
    }

    fn build_resources(&self, resources: &mut SectionBuilder<'_>) -> StackResult<()> {
        declare(resources, DB_SECURITY_GROUP, "AWS::EC2::SecurityGroup", |p| {
            self.db_security_group(p)
        });
        declare(resources, DB_SUBNET_GROUP, "AWS::RDS::DBSubnetGroup", |p| {
            self.db_subnet_group(p)
        });
        declare(resources, DB_INSTANCE, "AWS::RDS::DBInstance", |p| self.db_instance(p));
        resources.section(MEDIA_BUCKET, |r| {
            r.set("Type", "AWS::S3::Bucket");
        });
        Ok(())
    }

    fn build_outputs(&self, outputs: &mut SectionBuilder<'_>) -> StackResult<()> {
        output(
            outputs,
            OUTPUT_MEDIA_BUCKET,
            "S3 bucket name for storing media",
            reference(MEDIA_BUCKET),
        );
        output(
            outputs,
            OUTPUT_DB_ENDPOINT,
            "The end point of DB instance",
            get_att(DB_INSTANCE, "Endpoint.Address"),
        );
        output(
            outputs,
            OUTPUT_DB_SECURITY_GROUP,
            "Security group shared by the DB instance and the cache cluster",
            reference(DB_SECURITY_GROUP),
        );
        Ok(())
    }
}

/// One tcp ingress rule per (CIDR, port), CIDR-major: for each range the
/// database port, then the cache port.
pub fn ingress_rules(cidrs: &[String]) -> Vec<Value> {
    cidrs
        .iter()
        .flat_map(|cidr| {
            [DB_PORT, CACHE_PORT].into_iter().map(move |port| {
                Value::Mapping(
                    Mapping::new()
                        .with("IpProtocol", "tcp")
                        .with("FromPort", port)
                        .with("ToPort", port)
                        .with("CidrIp", cidr.as_str()),
                )
            })
        })
        .collect()
}
