//! Injection points: by name, by type and placeholder values.

mod common;

use std::sync::Arc;

use common::Node;
use ferrous_beans::{
    AutowiredAnnotationProcessor, Bean, BeanContainer, BeanDefinition, BeanType, ConfigProvider,
    ConfigValue, ContainerError, ContainerSettings, DefaultConversionService, InjectionKind,
    InjectionMetadataResolver, InjectionPoint, MapConfigSource, PlaceholderConfigurer, TypeKey,
    Value, ValueKind,
};

trait Mailer: Send + Sync {}

#[derive(Default)]
struct SmtpMailer;
impl Bean for SmtpMailer {}

#[derive(Default)]
struct NullMailer;
impl Bean for NullMailer {}

fn mailer<T: Bean + Default>() -> BeanDefinition {
    BeanDefinition::new(
        BeanType::builder::<T>()
            .default_constructor()
            .interface::<dyn Mailer>()
            .build(),
    )
}

fn config() -> ConfigProvider {
    ConfigProvider::new().with_source(
        MapConfigSource::new()
            .with("smtp.host", ConfigValue::String("mail.local".into()))
            .with("smtp.port", ConfigValue::Integer(2525))
            .with("smtp.url", ConfigValue::String("smtp://${smtp.host}:${smtp.port}".into())),
    )
}

#[test]
fn test_by_name_injection() {
    let container = BeanContainer::new();
    container.register_definition("mailer", mailer::<SmtpMailer>());
    container.register_definition("backup", mailer::<NullMailer>());
    container.register_definition(
        "notifier",
        BeanDefinition::new(
            BeanType::builder::<Node>()
                .default_constructor()
                .autowired("mailer")
                .autowired_qualified("fallback", "backup")
                .build(),
        ),
    );

    let notifier = container.get::<Node>("notifier").unwrap();
    assert!(notifier.object("mailer").unwrap().is::<SmtpMailer>());
    assert!(notifier.object("fallback").unwrap().is::<NullMailer>());
}

fn by_type_notifier() -> BeanDefinition {
    BeanDefinition::new(
        BeanType::builder::<Node>()
            .default_constructor()
            .autowired_by_type::<dyn Mailer>("mailer")
            .build(),
    )
    .lazy()
}

#[test]
fn test_by_type_injection() {
    let container = BeanContainer::new();
    container.register_definition("notifier", by_type_notifier());

    let err = container.resolve("notifier").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::NoMatchingType { .. }));

    container.register_definition("smtp", mailer::<SmtpMailer>());
    let notifier = container.get::<Node>("notifier").unwrap();
    assert!(Arc::ptr_eq(
        &notifier.object("mailer").unwrap(),
        &container.resolve("smtp").unwrap()
    ));
}

#[test]
fn test_by_type_injection_rejects_ambiguity() {
    let container = BeanContainer::new();
    container.register_definition("smtp", mailer::<SmtpMailer>());
    container.register_definition("null", mailer::<NullMailer>());
    container.register_definition("notifier", by_type_notifier());

    let err = container.resolve("notifier").unwrap_err();
    match err.root_cause() {
        ContainerError::AmbiguousType { candidates, .. } => {
            assert_eq!(candidates, &["smtp", "null"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.creation_path(), vec!["notifier"]);
}

#[test]
fn test_value_injection_through_placeholders() {
    let container = BeanContainer::new();
    container.set_conversion_service(Arc::new(DefaultConversionService::new()));
    Arc::new(PlaceholderConfigurer::new(config()).unwrap())
        .install(&container)
        .unwrap();

    container.register_definition(
        "client",
        BeanDefinition::new(
            BeanType::builder::<Node>()
                .default_constructor()
                .property("port", ValueKind::Int)
                .value("url", "${smtp.url}")
                .value("port", "${smtp.port}")
                .value("timeout", "${smtp.timeout:30s}")
                .build(),
        ),
    );

    let client = container.get::<Node>("client").unwrap();
    assert_eq!(client.get("url"), Some(Value::from("smtp://mail.local:2525")));
    assert_eq!(client.get("port"), Some(Value::Int(2525)));
    assert_eq!(client.get("timeout"), Some(Value::from("30s")));
}

#[test]
fn test_unresolvable_value_fails_the_bean() {
    let container = BeanContainer::new();
    Arc::new(PlaceholderConfigurer::new(config()).unwrap())
        .install(&container)
        .unwrap();
    container.register_definition(
        "client",
        BeanDefinition::new(
            BeanType::builder::<Node>()
                .default_constructor()
                .value("user", "${smtp.user}")
                .build(),
        ),
    );

    match container.resolve("client") {
        Err(ContainerError::ConstructionFailed { source, .. }) => match *source {
            ContainerError::PropertyAssignmentFailed { property, source, .. } => {
                assert_eq!(property, "user");
                assert!(matches!(*source, ContainerError::Config(_)));
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_configurer_rewrites_definition_literals() {
    let container = BeanContainer::new();
    container.register_definition(
        "client",
        BeanDefinition::new(BeanType::of::<Node>())
            .property("url", "${smtp.url}")
            .property("hosts", Value::List(vec![Value::from("${smtp.host}"), Value::from("relay")]))
            .reference("peer", "other"),
    );
    container.register_definition("other", BeanDefinition::new(BeanType::of::<Node>()));
    Arc::new(PlaceholderConfigurer::new(config()).unwrap())
        .install(&container)
        .unwrap();

    let client = container.get::<Node>("client").unwrap();
    assert_eq!(client.get("url"), Some(Value::from("smtp://mail.local:2525")));
    assert_eq!(
        client.get("hosts"),
        Some(Value::List(vec![Value::from("mail.local"), Value::from("relay")]))
    );
    assert!(client.object("peer").unwrap().is::<Node>());
}

#[test]
fn test_injection_points_ignored_when_disabled() {
    let container = BeanContainer::with_settings(ContainerSettings {
        annotation_injection: false,
        ..ContainerSettings::default()
    });
    assert_eq!(container.post_processor_count(), 0);
    container.register_definition("mailer", mailer::<SmtpMailer>());
    container.register_definition(
        "notifier",
        BeanDefinition::new(
            BeanType::builder::<Node>()
                .default_constructor()
                .autowired("mailer")
                .build(),
        ),
    );

    let notifier = container.get::<Node>("notifier").unwrap();
    assert!(notifier.get("mailer").is_none());
}

/// Injects every `Mailer` property by type, whatever the bean type declares.
struct ConventionMetadata;

impl InjectionMetadataResolver for ConventionMetadata {
    fn injection_points(&self, bean_type: &BeanType) -> Vec<InjectionPoint> {
        if bean_type.short_name() == "Node" {
            vec![InjectionPoint::new(
                "mailer",
                InjectionKind::ByType(TypeKey::of::<dyn Mailer>()),
            )]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_custom_injection_metadata() {
    let container = BeanContainer::with_settings(ContainerSettings {
        annotation_injection: false,
        ..ContainerSettings::default()
    });
    container.add_post_processor(Arc::new(AutowiredAnnotationProcessor::with_metadata(Arc::new(
        ConventionMetadata,
    ))));
    container.register_definition("smtp", mailer::<SmtpMailer>());
    container.register_definition("node", BeanDefinition::new(BeanType::of::<Node>()));

    let node = container.get::<Node>("node").unwrap();
    assert!(node.object("mailer").unwrap().is::<SmtpMailer>());
}
