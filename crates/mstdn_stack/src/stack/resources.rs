//! Shared stack: cache cluster, admin identity and container image repositories.
//!
//! Reads the db stack's security group and media bucket from the resource
//! registry, so it can only be built after the db stack is registered.

use mstdn_template::{Mapping, SectionBuilder, Value};

use crate::error::StackResult;
use crate::identity::resource_name;
use crate::stack::db::{OUTPUT_DB_SECURITY_GROUP, OUTPUT_MEDIA_BUCKET};
use crate::stack::{declare, get_att, output, reference, StackBuilder, StackInputs, StackKind};

pub const REDIS_SUBNET_GROUP: &str = "RedisSubnetGroup";
pub const REDIS_CLUSTER: &str = "RedisCluster";
pub const ADMIN_USER: &str = "AdminUser";
pub const ADMIN_ACCESS_KEY: &str = "AdminAccessKey";
pub const NGINX_REPOSITORY: &str = "NginxRepository";
pub const MASTODON_REPOSITORY: &str = "MastodonRepository";
pub const REPOSITORY_ACCESS_POLICY: &str = "RepositoryAccessPolicy";

pub const OUTPUT_REDIS_ENDPOINT: &str = "RedisEndPoint";
pub const OUTPUT_ADMIN_ACCESS_KEY_ID: &str = "AdminAccessKeyId";
pub const OUTPUT_ADMIN_SECRET_ACCESS_KEY: &str = "AdminSecretAccessKey";
pub const OUTPUT_NGINX_REPOSITORY: &str = "NginxRepository";
pub const OUTPUT_MASTODON_REPOSITORY: &str = "MastodonRepository";
pub const OUTPUT_REPOSITORY_ACCESS_POLICY_ARN: &str = "RepositoryAccessPolicyArn";

/// Registry keys this stack needs, in the order they are checked.
pub const REQUIRED_REGISTRY_KEYS: [&str; 2] = [OUTPUT_DB_SECURITY_GROUP, OUTPUT_MEDIA_BUCKET];

/// (logical name, component) of each container image repository.
pub const REPOSITORIES: [(&str, &str); 2] = [(NGINX_REPOSITORY, "nginx"), (MASTODON_REPOSITORY, "mastodon")];

const POLICY_VERSION: &str = "2012-10-17";
const REPOSITORY_POLICY_VERSION: &str = "2008-10-17";

const PUSH_PULL_ACTIONS: [&str; 7] = [
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
    "ecr:BatchCheckLayerAvailability",
    "ecr:PutImage",
    "ecr:InitiateLayerUpload",
    "ecr:UploadLayerPart",
    "ecr:CompleteLayerUpload",
];

/// Values resolved from the registry before any section is written.
struct Dependencies<'a> {
    db_security_group: &'a str,
    media_bucket: &'a str,
}

/// Resources stack builder.
pub struct ResourcesStack<'a> {
    inputs: StackInputs<'a>,
}

impl<'a> ResourcesStack<'a> {
    pub fn new(inputs: StackInputs<'a>) -> Self {
        Self { inputs }
    }

    fn dependencies(&self) -> StackResult<Dependencies<'a>> {
        let stack = self.kind().as_str();
        let registry = self.inputs.registry;
        Ok(Dependencies {
            db_security_group: registry.require(OUTPUT_DB_SECURITY_GROUP, stack)?,
            media_bucket: registry.require(OUTPUT_MEDIA_BUCKET, stack)?,
        })
    }

    /// IAM user name of the administrative identity.
    pub fn admin_user_name(&self) -> String {
        format!(
            "{}-{}-mastodon-admin",
            self.inputs.config.district_name, self.inputs.config.heritage_name
        )
    }

    fn repository_name(&self, component: &str) -> String {
        format!("{}/{}", self.resource_name(), component)
    }

    fn redis_subnet_group(&self, p: &mut SectionBuilder<'_>) {
        p.set("CacheSubnetGroupName", self.resource_name())
            .set("SubnetIds", self.inputs.network.subnet_ids.clone())
            .set(
                "Description",
                format!("redis subnet group for mastodon {}", self.resource_name()),
            );
    }

    fn redis_cluster(&self, p: &mut SectionBuilder<'_>, deps: &Dependencies<'_>) {
        let redis = &self.inputs.config.redis;
        p.set("ClusterName", self.resource_name())
            .set("CacheNodeType", &redis.cache_node_type)
            .set("Engine", "redis")
            .set("NumCacheNodes", redis.num_cache_nodes)
            .set("VpcSecurityGroupIds", vec![deps.db_security_group])
            .set("CacheSubnetGroupName", reference(REDIS_SUBNET_GROUP));
    }

    fn admin_user(&self, p: &mut SectionBuilder<'_>, deps: &Dependencies<'_>) {
        let bucket_arn = format!("arn:aws:s3:::{}", deps.media_bucket);
        let statement = Mapping::new()
            .with("Effect", "Allow")
            .with("Action", vec!["s3:*"])
            .with("Resource", vec![bucket_arn.clone(), format!("{}/*", bucket_arn)]);
        let policy = Mapping::new()
            .with("PolicyName", format!("{}-media-bucket", self.resource_name()))
            .with("PolicyDocument", policy_document(POLICY_VERSION, vec![statement]));

        p.set("UserName", self.admin_user_name())
            .set("Policies", vec![policy]);
    }

    fn admin_access_key(&self, p: &mut SectionBuilder<'_>) {
        p.set("UserName", reference(ADMIN_USER));
    }

    fn repository(&self, p: &mut SectionBuilder<'_>, component: &str) {
        let statement = Mapping::new()
            .with("Sid", "AllowPushPull")
            .with("Effect", "Allow")
            .with(
                "Principal",
                Mapping::new().with("AWS", vec![get_att(ADMIN_USER, "Arn")]),
            )
            .with("Action", PUSH_PULL_ACTIONS.to_vec());

        p.set("RepositoryName", self.repository_name(component))
            .set(
                "RepositoryPolicyText",
                policy_document(REPOSITORY_POLICY_VERSION, vec![statement]),
            );
    }

    fn repository_access_policy(&self, p: &mut SectionBuilder<'_>) {
        let token = Mapping::new()
            .with("Effect", "Allow")
            .with("Action", vec!["ecr:GetAuthorizationToken"])
            .with("Resource", "*");
        let push_pull = Mapping::new()
            .with("Effect", "Allow")
            .with("Action", PUSH_PULL_ACTIONS.to_vec())
            .with(
                "Resource",
                REPOSITORIES
                    .iter()
                    .map(|(logical_name, _)| get_att(logical_name, "Arn"))
                    .collect::<Vec<_>>(),
            );

        p.set(
            "Description",
            format!("push/pull access to the image repositories of {}", self.resource_name()),
        )
        .set("PolicyDocument", policy_document(POLICY_VERSION, vec![token, push_pull]))
        .set("Users", vec![reference(ADMIN_USER)]);
    }
}

impl StackBuilder for ResourcesStack<'_> {
    fn kind(&self) -> StackKind {
        StackKind::Resources
    }

    fn resource_name(&self) -> String {
        resource_name(self.inputs.identity, None)
    }

    fn check_prerequisites(&self) -> StackResult<()> {
        self.dependencies()?;
        self.inputs.config.validate_resources()?;
        self.inputs.network.require_subnet_ids()?;
        Ok(())
    }

    fn build_resources(&self, resources: &mut SectionBuilder<'_>) -> StackResult<()> {
        let deps = self.dependencies()?;

        declare(resources, REDIS_SUBNET_GROUP, "AWS::ElastiCache::SubnetGroup", |p| {
            self.redis_subnet_group(p)
        });
        declare(resources, REDIS_CLUSTER, "AWS::ElastiCache::CacheCluster", |p| {
            self.redis_cluster(p, &deps)
        });
        declare(resources, ADMIN_USER, "AWS::IAM::User", |p| self.admin_user(p, &deps));
        declare(resources, ADMIN_ACCESS_KEY, "AWS::IAM::AccessKey", |p| {
            self.admin_access_key(p)
        });
        for (logical_name, component) in REPOSITORIES {
            declare(resources, logical_name, "AWS::ECR::Repository", |p| {
                self.repository(p, component)
            });
        }
        declare(resources, REPOSITORY_ACCESS_POLICY, "AWS::IAM::ManagedPolicy", |p| {
            self.repository_access_policy(p)
        });
        Ok(())
    }

    fn build_outputs(&self, outputs: &mut SectionBuilder<'_>) -> StackResult<()> {
        output(
            outputs,
            OUTPUT_REDIS_ENDPOINT,
            "The end point of the redis cluster",
            get_att(REDIS_CLUSTER, "RedisEndpoint.Address"),
        );
        output(
            outputs,
            OUTPUT_ADMIN_ACCESS_KEY_ID,
            "Access key id of the admin user",
            reference(ADMIN_ACCESS_KEY),
        );
        output(
            outputs,
            OUTPUT_ADMIN_SECRET_ACCESS_KEY,
            "Secret access key of the admin user",
            get_att(ADMIN_ACCESS_KEY, "SecretAccessKey"),
        );
        output(
            outputs,
            OUTPUT_NGINX_REPOSITORY,
            "ECR repository for the nginx image",
            reference(NGINX_REPOSITORY),
        );
        output(
            outputs,
            OUTPUT_MASTODON_REPOSITORY,
            "ECR repository for the mastodon image",
            reference(MASTODON_REPOSITORY),
        );
        output(
            outputs,
            OUTPUT_REPOSITORY_ACCESS_POLICY_ARN,
            "ARN of the managed policy granting push/pull on the repositories",
            reference(REPOSITORY_ACCESS_POLICY),
        );
        Ok(())
    }
}

fn policy_document(version: &str, statements: Vec<Mapping>) -> Value {
    Value::Mapping(
        Mapping::new()
            .with("Version", version)
            .with("Statement", statements),
    )
}
