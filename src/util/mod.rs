pub mod err;
pub mod retry;
#[cfg(feature = "tracing")]
pub mod trace;

#[cfg(test)]
pub(crate) mod fixture;
