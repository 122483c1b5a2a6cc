//! Business logic services

pub mod catalog;
pub mod email;
pub mod inventory;
pub mod issuance;
pub mod requests;
pub mod users;

use crate::{
    config::{AuthConfig, EmailConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub inventory: inventory::InventoryService,
    pub requests: requests::RequestsService,
    pub issuance: issuance::IssuanceService,
    pub users: users::UsersService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(
        repository: Repository,
        auth_config: AuthConfig,
        email_config: EmailConfig,
    ) -> AppResult<Self> {
        let email = email::EmailService::new(email_config);
        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            inventory: inventory::InventoryService::new(repository.clone()),
            requests: requests::RequestsService::new(repository.clone(), email.clone()),
            issuance: issuance::IssuanceService::new(repository.clone()),
            users: users::UsersService::new(repository, auth_config, email.clone()),
            email,
        })
    }
}
