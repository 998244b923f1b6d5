#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a model is already registered for this type")]
    AlreadyRegistered,

    #[error(transparent)]
    Dispatch(#[from] objectstore_dispatcher::DispatchError),
}
