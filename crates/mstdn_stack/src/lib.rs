//! # mstdn_stack
//!
//! Stack builders and cross-stack reference tracking for a Mastodon
//! deployment on Barcelona.
//!
//! Each stack renders one CloudFormation template from three inputs: the
//! deployment [`Config`], the [`NetworkFacts`] of the target VPC, and the
//! [`ResourceRegistry`] of identifiers earlier deployments produced.
//!
//! ## Deploy order
//!
//! The resources stack attaches the cache cluster to the db stack's
//! security group and scopes the admin policy to the db stack's media
//! bucket. The db stack must therefore be deployed and its outputs
//! registered first; building the resources stack before that fails with
//! [`StackError::MissingDependency`].
//!
//! ## Example
//!
//! ```rust
//! use mstdn_stack::{Config, DeploymentId, NetworkFacts, ResourceRegistry, StackInputs, StackKind};
//! use mstdn_template::Format;
//!
//! let id = DeploymentId::new("sagrada").unwrap();
//! let mut config = Config::default();
//! config.db.user = "u".into();
//! config.db.password = "p".into();
//! config.db.allocated_storage = 5;
//! config.db.instance_class = "db.t2.micro".into();
//! config.db.storage_type = "gp2".into();
//! let network = NetworkFacts::new(vec!["s-1".into()], vec!["10.0.1.0/24".into()]);
//! let registry = ResourceRegistry::new();
//!
//! let inputs = StackInputs::new(&id, &config, &network, &registry);
//! let json = StackKind::Db.builder(inputs).render(Format::Json).unwrap();
//! assert!(json.contains("mstdn-sagrada-db"));
//! ```

pub mod config;
pub mod deploy;
pub mod error;
pub mod identity;
pub mod mock;
pub mod network;
pub mod registry;
pub mod stack;

pub use config::{CacheSettings, ClusterSettings, Config, ConfigOptions, DbSettings, SourceSettings, DEFAULT_CONFIG_FILE};
pub use deploy::{DeployReport, Deployer, ProvisioningSink, StackOutputs};
pub use error::{ErrorKind, StackError, StackResult};
pub use identity::{resource_name, DeploymentId, MAX_DEPLOYMENT_ID_LEN, RESOURCE_PREFIX};
pub use mock::{CapturedDeploy, MockSink};
pub use network::{NetworkFacts, DEFAULT_NETWORK_FILE};
pub use registry::{ResourceRegistry, DEFAULT_REGISTRY_FILE};
pub use stack::{get_att, reference, DbStack, ResourcesStack, StackBuilder, StackInputs, StackKind, TEMPLATE_FORMAT_VERSION};
