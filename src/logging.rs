//! Helper macro enforcing consistent connection log fields.
//!
//! Every event about a connection carries a `connection` field with its id so downstream
//! parsing can group build and migration steps per connection. Field values go through
//! `Display`; pass masked URIs only.

/// Log an event for a connection id plus any extra fields.
#[macro_export]
macro_rules! connection_event {
    ($level:ident, $target:expr, $event:expr, connection = $connection:expr $(, $field:ident = $value:expr )* $(,)?) => {
        tracing::$level!(
            target = $target,
            event = $event,
            connection = %$connection,
            $($field = %$value,)*
        )
    };
}
