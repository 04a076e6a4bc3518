//! # mstdn_template
//!
//! CloudFormation document assembly for mstdn.
//!
//! This crate provides a typed value tree, a scoped section builder and a
//! deterministic serializer. Values are plain data: `Ref` and `Fn::GetAtt`
//! expressions are emitted as-is and resolved by the provider.
//!
//! ## Example
//!
//! ```rust
//! use mstdn_template::{TemplateBuilder, Value, RESOURCES, OUTPUTS};
//!
//! let mut builder = TemplateBuilder::new();
//! builder
//!     .set("AWSTemplateFormatVersion", "2010-09-09")
//!     .section(RESOURCES, |r| {
//!         r.section("MediaBucket", |b| {
//!             b.set("Type", "AWS::S3::Bucket");
//!         });
//!     })
//!     .section(OUTPUTS, |o| {
//!         o.section("MediaBucket", |out| {
//!             out.set("Value", Value::reference("MediaBucket"));
//!         });
//!     });
//!
//! let json = builder.finish().to_json().unwrap();
//! assert!(json.contains("MediaBucket"));
//! ```

pub mod builder;
pub mod error;
pub mod references;
pub mod template;
pub mod value;

pub use builder::{SectionBuilder, TemplateBuilder};
pub use error::{TemplateError, TemplateResult};
pub use references::{collect_references, unresolved_references, Reference};
pub use template::{Format, Template, DESCRIPTION, FORMAT_VERSION, OUTPUTS, PARAMETERS, RESOURCES};
pub use value::{Mapping, Scalar, Value};
