use xxhash_rust::const_xxh3::xxh3_64;

/// Routing key of a method name in a [`MethodTable`](crate::MethodTable).
///
/// Names are case sensitive. Usable in `const` items, which is how
/// [`CapabilityMethod::METHOD_ID`](crate::CapabilityMethod::METHOD_ID) is
/// filled in.
pub const fn method_id_hash(name: &str) -> u64 {
    xxh3_64(name.as_bytes())
}

/// Expands to the routing key of a literal method name as a constant.
///
/// A handler registered with [`MethodTable::register`](crate::MethodTable::register)
/// under `"greet"` answers calls made through any typed definition whose
/// `METHOD_NAME` is `"greet"`, because both resolve to this key.
///
/// ```rust,no_run
/// use ww_invoke_capability::{capability_method_id, method_id_hash};
///
/// const GREET: u64 = capability_method_id!("greet");
/// assert_eq!(GREET, method_id_hash("greet"));
/// ```
#[macro_export]
macro_rules! capability_method_id {
    ($name:literal) => {{
        const KEY: u64 = $crate::method_id_hash($name);
        KEY
    }};
}
