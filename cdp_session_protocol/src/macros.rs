/// Implements `Method` for a concrete params/event struct with a literal
/// `Domain.method` identifier, the hand-written stand-in for what a PDL
/// generator would emit.
macro_rules! impl_method {
    ($ty:ty, $id:literal) => {
        impl cdp_session_types::Method for $ty {
            fn identifier(&self) -> std::borrow::Cow<'static, str> {
                std::borrow::Cow::Borrowed($id)
            }
        }
    };
}

/// Implements `Method` + `Command` for a command params struct.
macro_rules! impl_command {
    ($ty:ty, $id:literal, $resp:ty) => {
        impl_method!($ty, $id);
        impl cdp_session_types::Command for $ty {
            type Response = $resp;
        }
    };
}
