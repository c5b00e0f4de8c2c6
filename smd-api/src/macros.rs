//! Utility macros

/// Implement `FromRef<AppState>` for a field of [`crate::state::AppState`],
/// so handlers can extract just the part of the state they use.
///
/// ```ignore
/// impl_from_ref!(EventHub, hub);
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
