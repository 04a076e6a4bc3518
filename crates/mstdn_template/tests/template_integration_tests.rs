//! Integration tests for template assembly.

use mstdn_template::{
    unresolved_references, Format, Mapping, TemplateBuilder, TemplateError, Value, OUTPUTS, PARAMETERS,
    RESOURCES,
};

fn build() -> mstdn_template::Template {
    let mut builder = TemplateBuilder::new();
    builder
        .set("Description", "integration")
        .set("AWSTemplateFormatVersion", "2010-09-09");
    builder.section(PARAMETERS, |_| {});
    builder.section(RESOURCES, |r| {
        r.section("User", |u| {
            u.set("Type", "AWS::IAM::User");
            u.section("Properties", |p| {
                let statement = Mapping::new()
                    .with("Effect", "Allow")
                    .with("Action", vec!["s3:*"])
                    .with(
                        "Condition",
                        Mapping::new().with(
                            "StringEquals",
                            Mapping::new().with("aws:RequestedRegion", vec!["eu-west-1"]),
                        ),
                    );
                p.set(
                    "Policies",
                    vec![Mapping::new().with(
                        "PolicyDocument",
                        Mapping::new().with("Statement", vec![statement]),
                    )],
                );
            });
        });
        r.section("Key", |k| {
            k.set("Type", "AWS::IAM::AccessKey");
            k.section("Properties", |p| {
                p.set("UserName", Value::reference("User"));
            });
        });
    });
    builder.section(OUTPUTS, |o| {
        o.section("Secret", |s| {
            s.set("Value", Value::attribute("Key", ["SecretAccessKey"]));
        });
    });
    builder.finish()
}

#[test]
fn test_rendering_is_byte_identical() {
    for format in [Format::Json, Format::Yaml] {
        assert_eq!(build().render(format).unwrap(), build().render(format).unwrap());
    }
}

#[test]
fn test_top_level_layout() {
    let template = build();
    assert_eq!(
        template.root().keys().collect::<Vec<_>>(),
        vec!["Description", "AWSTemplateFormatVersion", "Parameters", "Resources", "Outputs"]
    );
    assert_eq!(
        template.resources().unwrap().keys().collect::<Vec<_>>(),
        vec!["User", "Key"]
    );
}

#[test]
fn test_deeply_nested_values_serialize() {
    let json: serde_json::Value = serde_json::from_str(&build().to_json().unwrap()).unwrap();
    let region = &json["Resources"]["User"]["Properties"]["Policies"][0]["PolicyDocument"]["Statement"][0]
        ["Condition"]["StringEquals"]["aws:RequestedRegion"][0];
    assert_eq!(region, "eu-west-1");
    assert_eq!(json["Resources"]["Key"]["Properties"]["UserName"]["Ref"], "User");
    assert_eq!(json["Outputs"]["Secret"]["Value"]["Fn::GetAtt"][1], "SecretAccessKey");
}

#[test]
fn test_reference_closure_holds() {
    assert!(unresolved_references(&build(), |_| false).is_empty());
}

#[test]
fn test_misuse_is_reported() {
    let mut builder = TemplateBuilder::new();
    builder.section(OUTPUTS, |_| {});
    assert!(matches!(builder.try_set(OUTPUTS, "x"), Err(TemplateError::SectionClosed(_))));
}
