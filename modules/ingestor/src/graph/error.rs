use sea_orm::DbErr;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("ingestion lease for project {0} is held by another pipeline")]
    LeaseUnavailable(Uuid),
}
