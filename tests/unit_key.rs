//! Unit tests for TypeKey

use std::any::TypeId;
use std::collections::HashSet;

use ferrous_beans::TypeKey;

trait Repository: Send + Sync {}

struct UserRepository;

struct Wrapper<T>(T);

#[test]
fn test_key_name_concrete() {
    let key = TypeKey::of::<UserRepository>();
    assert_eq!(key.name(), "unit_key::UserRepository");
    assert_eq!(key.short_name(), "UserRepository");
    assert_eq!(key.to_string(), key.name());
}

#[test]
fn test_key_name_trait_object() {
    let key = TypeKey::of::<dyn Repository>();
    assert_eq!(key.name(), "dyn unit_key::Repository");
    assert_eq!(key.short_name(), "Repository");
}

#[test]
fn test_key_short_name_drops_generics() {
    let key = TypeKey::of::<Wrapper<UserRepository>>();
    assert_eq!(key.short_name(), "Wrapper");
}

#[test]
fn test_key_equality_uses_type_id() {
    assert_eq!(TypeKey::of::<u32>(), TypeKey::of::<u32>());
    assert_ne!(TypeKey::of::<u32>(), TypeKey::of::<u64>());
    assert_ne!(TypeKey::of::<UserRepository>(), TypeKey::of::<dyn Repository>());
    assert_eq!(TypeKey::of::<String>().id(), TypeId::of::<String>());
}

#[test]
fn test_key_hash_consistent_with_eq() {
    let mut keys = HashSet::new();
    keys.insert(TypeKey::of::<UserRepository>());
    keys.insert(TypeKey::of::<UserRepository>());
    keys.insert(TypeKey::of::<dyn Repository>());
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&TypeKey::of::<dyn Repository>()));
}
