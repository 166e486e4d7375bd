use propfit::distributed::optimizer::OptimizerError;
use propfit::distributed::server::ServerError;
use propfit::forcefield::document::DocumentError;
use propfit::forcefield::edit::EditError;
use propfit::options::OptionsError;
use propfit::restart::RestartError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Restart(#[from] RestartError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Forcefield preparation failed: {0}")]
    Edit(#[from] EditError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
