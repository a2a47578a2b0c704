/// Converts errors from their error type (of the submodule) to that of
/// a roadmatch::Error variant.
///
/// ```rust,ignore
/// use roadmatch::network::LoadError;
/// roadmatch::impl_err!(LoadError, Load);
/// ```
pub mod err_macro {
    #[macro_export]
    macro_rules! impl_err {
        ($from:ty, $variant:ident) => {
            impl From<$from> for $crate::Error {
                fn from(value: $from) -> Self {
                    $crate::Error::$variant(value)
                }
            }
        };
    }

    pub use impl_err;
}
