//! Integration tests for stack building, the registry and deployment.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use mstdn_stack::stack::db::{CACHE_PORT, DB_PORT};
use mstdn_stack::stack::resources::{REPOSITORIES, REQUIRED_REGISTRY_KEYS};
use mstdn_stack::{
    Config, DbSettings, Deployer, DeploymentId, ErrorKind, MockSink, NetworkFacts, ResourceRegistry,
    StackError, StackInputs, StackKind, DEFAULT_REGISTRY_FILE,
};
use mstdn_template::{unresolved_references, Format, Value};
use tempfile::tempdir;

fn identity() -> DeploymentId {
    DeploymentId::new("sagrada").unwrap()
}

fn config() -> Config {
    let mut config = Config::default();
    config.region = "eu-west-1".to_string();
    config.district_name = "eixample".to_string();
    config.heritage_name = "sagrada".to_string();
    config.db = DbSettings {
        user: "u".to_string(),
        password: "p".to_string(),
        allocated_storage: 5,
        instance_class: "db.t2.micro".to_string(),
        storage_type: "gp2".to_string(),
        multi_az: false,
    };
    config.redis.cache_node_type = "cache.t2.micro".to_string();
    config.redis.num_cache_nodes = 1;
    config
}

fn network() -> NetworkFacts {
    NetworkFacts::new(
        vec!["s-1".to_string(), "s-2".to_string()],
        vec!["10.0.1.0/24".to_string(), "10.0.2.0/24".to_string()],
    )
}

fn db_registry() -> ResourceRegistry {
    [
        ("MediaBucket", "mstdn-sagrada-db-mediabucket-abc"),
        ("DBEndPoint", "mstdn-sagrada-db.xyz.eu-west-1.rds.amazonaws.com"),
        ("DBSecurityGroup", "sg-0123"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_db_stack_end_to_end() {
    let (id, config, network, registry) = (identity(), config(), network(), ResourceRegistry::new());
    let stack = StackKind::Db.builder(StackInputs::new(&id, &config, &network, &registry));
    let template = stack.build().unwrap();

    assert_eq!(stack.resource_name(), "mstdn-sagrada-db");
    assert_eq!(
        template.get("Description").and_then(Value::as_str),
        Some("AWS CloudFormation for Barcelona mstdn-sagrada-db")
    );
    assert_eq!(
        template.get("AWSTemplateFormatVersion").and_then(Value::as_str),
        Some("2010-09-09")
    );
    assert!(template.parameters().unwrap().is_empty());

    let ingress = template
        .properties("DBSecurityGroup")
        .and_then(|p| p.get("SecurityGroupIngress"))
        .and_then(Value::as_list)
        .unwrap();
    assert_eq!(ingress.len(), 4);

    assert_eq!(template.output_value("MediaBucket"), Some(&Value::reference("MediaBucket")));
    assert_eq!(
        template.output_value("DBEndPoint"),
        Some(&Value::attribute("DBInstance", ["Endpoint.Address"]))
    );
}

#[test]
fn test_db_instance_properties() {
    let (id, config, network, registry) = (identity(), config(), network(), ResourceRegistry::new());
    let template = StackKind::Db
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap();

    let props = template.properties("DBInstance").unwrap();
    assert_eq!(template.resource_type("DBInstance"), Some("AWS::RDS::DBInstance"));
    assert_eq!(props.get("Engine").and_then(Value::as_str), Some("postgres"));
    assert_eq!(props.get("DBInstanceClass").and_then(Value::as_str), Some("db.t2.micro"));
    assert_eq!(props.get("DBInstanceIdentifier").and_then(Value::as_str), Some("mstdn-sagrada-db"));
    assert_eq!(props.get("MasterUsername").and_then(Value::as_str), Some("u"));
    assert_eq!(props.get("MultiAZ"), Some(&Value::from(false)));
    assert_eq!(props.get("DBSubnetGroupName"), Some(&Value::reference("DBSubnetGroup")));

    let subnets = template
        .properties("DBSubnetGroup")
        .and_then(|p| p.get("SubnetIds"))
        .unwrap();
    assert_eq!(subnets, &Value::from(vec!["s-1", "s-2"]));

    assert_eq!(template.resource_type("MediaBucket"), Some("AWS::S3::Bucket"));
    assert!(template.properties("MediaBucket").is_none());
}

#[test]
fn test_ingress_is_two_rules_per_range() {
    let (id, config, registry) = (identity(), config(), ResourceRegistry::new());
    let cidrs: Vec<String> = (1..=3).map(|i| format!("10.0.{}.0/24", i)).collect();
    let network = NetworkFacts::new(vec!["s-1".to_string()], cidrs.clone());

    let template = StackKind::Db
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap();
    let ingress = template
        .properties("DBSecurityGroup")
        .and_then(|p| p.get("SecurityGroupIngress"))
        .and_then(Value::as_list)
        .unwrap();

    assert_eq!(ingress.len(), 2 * cidrs.len());
    for (i, rule) in ingress.iter().enumerate() {
        let expected_port = if i % 2 == 0 { DB_PORT } else { CACHE_PORT };
        assert_eq!(rule.get("CidrIp").and_then(Value::as_str), Some(cidrs[i / 2].as_str()));
        assert_eq!(rule.get("FromPort"), Some(&Value::from(expected_port)));
        assert_eq!(rule.get("ToPort"), Some(&Value::from(expected_port)));
    }
}

#[test]
fn test_vpc_id_is_emitted_when_known() {
    let (id, config, registry) = (identity(), config(), ResourceRegistry::new());
    let with_vpc = network().with_vpc("vpc-42");
    let template = StackKind::Db
        .builder(StackInputs::new(&id, &config, &with_vpc, &registry))
        .build()
        .unwrap();
    assert_eq!(
        template.properties("DBSecurityGroup").and_then(|p| p.get("VpcId")).and_then(Value::as_str),
        Some("vpc-42")
    );

    let without = network();
    let template = StackKind::Db
        .builder(StackInputs::new(&id, &config, &without, &registry))
        .build()
        .unwrap();
    assert!(template
        .properties("DBSecurityGroup")
        .and_then(|p| p.get("VpcId"))
        .is_none());
}

#[test]
fn test_resources_stack_outputs_are_exact() {
    let (id, config, network, registry) = (identity(), config(), network(), db_registry());
    let template = StackKind::Resources
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap();

    let keys: BTreeSet<&str> = template.outputs().unwrap().keys().collect();
    let expected: BTreeSet<&str> = [
        "RedisEndPoint",
        "AdminAccessKeyId",
        "AdminSecretAccessKey",
        "NginxRepository",
        "MastodonRepository",
        "RepositoryAccessPolicyArn",
    ]
    .into_iter()
    .collect();
    assert_eq!(keys, expected);

    assert_eq!(
        template.output_value("RedisEndPoint"),
        Some(&Value::attribute("RedisCluster", ["RedisEndpoint.Address"]))
    );
    assert_eq!(template.output_value("AdminAccessKeyId"), Some(&Value::reference("AdminAccessKey")));
    assert_eq!(
        template.output_value("AdminSecretAccessKey"),
        Some(&Value::attribute("AdminAccessKey", ["SecretAccessKey"]))
    );
    assert_eq!(
        template.output_value("RepositoryAccessPolicyArn"),
        Some(&Value::reference("RepositoryAccessPolicy"))
    );
}

#[test]
fn test_resources_stack_uses_registry_values() {
    let (id, config, network, registry) = (identity(), config(), network(), db_registry());
    let template = StackKind::Resources
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap();

    let cluster = template.properties("RedisCluster").unwrap();
    assert_eq!(cluster.get("VpcSecurityGroupIds"), Some(&Value::from(vec!["sg-0123"])));
    assert_eq!(cluster.get("CacheNodeType").and_then(Value::as_str), Some("cache.t2.micro"));
    assert_eq!(cluster.get("NumCacheNodes"), Some(&Value::from(1u32)));

    let user = template.properties("AdminUser").unwrap();
    assert_eq!(
        user.get("UserName").and_then(Value::as_str),
        Some("eixample-sagrada-mastodon-admin")
    );
    let json = template.to_json().unwrap();
    assert!(json.contains("arn:aws:s3:::mstdn-sagrada-db-mediabucket-abc/*"));
}

#[test]
fn test_repositories_grant_admin_user() {
    let (id, config, network, registry) = (identity(), config(), network(), db_registry());
    let template = StackKind::Resources
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap();

    for (logical_name, component) in REPOSITORIES {
        assert_eq!(template.resource_type(logical_name), Some("AWS::ECR::Repository"));
        let props = template.properties(logical_name).unwrap();
        assert_eq!(
            props.get("RepositoryName").and_then(Value::as_str),
            Some(format!("mstdn-sagrada/{}", component).as_str())
        );
        let principal = props
            .get("RepositoryPolicyText")
            .and_then(|p| p.get("Statement"))
            .and_then(Value::as_list)
            .and_then(|s| s[0].get("Principal"))
            .and_then(|p| p.get("AWS"))
            .unwrap();
        assert_eq!(principal, &Value::from(vec![Value::attribute("AdminUser", ["Arn"])]));
    }
}

#[test]
fn test_references_are_closed() {
    let (id, config, network) = (identity(), config(), network());
    let empty = ResourceRegistry::new();
    let registered = db_registry();

    for (kind, registry) in [(StackKind::Db, &empty), (StackKind::Resources, &registered)] {
        let template = kind
            .builder(StackInputs::new(&id, &config, &network, registry))
            .build()
            .unwrap();
        let unresolved = unresolved_references(&template, |name| registry.contains(name));
        assert!(unresolved.is_empty(), "{} stack has dangling references: {:?}", kind, unresolved);
    }
}

#[test]
fn test_render_is_deterministic() {
    let (id, config, network, registry) = (identity(), config(), network(), db_registry());

    for kind in StackKind::DEPLOY_ORDER {
        for format in [Format::Json, Format::Yaml] {
            let first = kind
                .builder(StackInputs::new(&id, &config, &network, &registry))
                .render(format)
                .unwrap();
            let second = kind
                .builder(StackInputs::new(&id, &config, &network, &registry))
                .render(format)
                .unwrap();
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_resources_stack_requires_db_security_group() {
    let (id, config, network) = (identity(), config(), network());
    let registry: ResourceRegistry = [("MediaBucket", "bucket")].into_iter().collect();

    let err = StackKind::Resources
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .render(Format::Json)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingDependency);
    assert!(matches!(err, StackError::MissingDependency { ref key, .. } if key == "DBSecurityGroup"));
}

#[test]
fn test_resources_stack_checks_security_group_first() {
    let (id, config, network, registry) = (identity(), config(), network(), ResourceRegistry::new());

    let err = StackKind::Resources
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap_err();

    assert!(matches!(err, StackError::MissingDependency { ref key, .. } if key == REQUIRED_REGISTRY_KEYS[0]));
}

#[test]
fn test_incomplete_config_fails_before_build() {
    let (id, network, registry) = (identity(), network(), ResourceRegistry::new());
    let mut config = config();
    config.db.instance_class.clear();

    let err = StackKind::Db
        .builder(StackInputs::new(&id, &config, &network, &registry))
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigurationIncomplete);
    assert!(err.to_string().contains("db.instance_class"));
}

#[tokio::test]
async fn test_deploy_all_registers_outputs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REGISTRY_FILE);
    let sink = MockSink::new().with_outputs(
        "mstdn-sagrada-db",
        [
            ("MediaBucket", "bucket-1"),
            ("DBEndPoint", "db.example"),
            ("DBSecurityGroup", "sg-1"),
        ],
    );
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(sink.clone()));

    let reports = deployer.deploy_all().await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].kind, StackKind::Db);
    assert_eq!(reports[1].stack_name, "mstdn-sagrada");
    let calls = sink.get_calls();
    assert_eq!(calls[0].stack_name, "mstdn-sagrada-db");
    assert!(calls[1].template_body.contains("sg-1"));

    let registry = ResourceRegistry::load(&path).unwrap();
    assert_eq!(registry.get("DBSecurityGroup"), Some("sg-1"));
    assert_eq!(registry.get("RedisEndPoint"), Some("mstdn-sagrada:RedisEndPoint"));
    assert_eq!(registry.len(), 9);
}

#[tokio::test]
async fn test_deploy_resources_first_fails_without_calling_sink() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REGISTRY_FILE);
    let sink = MockSink::new();
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(sink.clone()));

    let err = deployer.deploy(StackKind::Resources).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingDependency);
    assert_eq!(sink.call_count(), 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_failed_provisioning_leaves_registry_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REGISTRY_FILE);
    db_registry().save(&path).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let sink = MockSink::new().simulate_failure("stack rolled back");
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(sink));

    let err = deployer.deploy(StackKind::Resources).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provisioning);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_deployer_render_reads_persisted_registry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REGISTRY_FILE);
    db_registry().save(&path).unwrap();
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(MockSink::new()));

    let yaml = deployer.render(StackKind::Resources, Format::Yaml).unwrap();
    assert!(yaml.contains("sg-0123"));
}

#[tokio::test]
async fn test_deploy_cannot_change_another_stacks_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REGISTRY_FILE);
    db_registry().save(&path).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let sink = MockSink::new().with_outputs(
        "mstdn-sagrada",
        [
            ("RedisEndPoint", "redis.example"),
            ("DBSecurityGroup", "sg-other"),
            ("Bogus", "x"),
        ],
    );
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(sink));

    let err = deployer.deploy(StackKind::Resources).await.unwrap_err();

    assert!(matches!(err, StackError::RegistryConflict { ref key, .. } if key == "DBSecurityGroup"));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_deploy_registers_only_declared_outputs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REGISTRY_FILE);
    db_registry().save(&path).unwrap();

    let sink = MockSink::new().with_outputs(
        "mstdn-sagrada",
        [
            ("RedisEndPoint", "redis.example"),
            ("DBSecurityGroup", "sg-0123"),
            ("Bogus", "x"),
        ],
    );
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(sink));

    let report = deployer.deploy(StackKind::Resources).await.unwrap();

    assert_eq!(report.outputs.keys().collect::<Vec<_>>(), vec!["RedisEndPoint"]);
    let registry = ResourceRegistry::load(&path).unwrap();
    assert_eq!(registry.get("DBSecurityGroup"), Some("sg-0123"));
    assert_eq!(registry.get("RedisEndPoint"), Some("redis.example"));
    assert!(!registry.contains("Bogus"));
}

#[tokio::test]
async fn test_failed_registry_save_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join(DEFAULT_REGISTRY_FILE);
    let sink = MockSink::new();
    let deployer = Deployer::new(identity(), config(), network(), &path, Arc::new(sink.clone()));

    let err = deployer.deploy(StackKind::Db).await.unwrap_err();

    assert!(matches!(err, StackError::Persistence { .. }));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(sink.call_count(), 1);
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
