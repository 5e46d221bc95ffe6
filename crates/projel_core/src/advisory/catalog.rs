//! Installation catalog contract (circuit kinds and installation methods).
//!
//! The catalog only feeds choice lists; stored codes are never validated
//! against it.

use crate::model::circuit::{CircuitKind, InstallationMethod};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One selectable code with its human description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descricao")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Unreachable(String),
    InvalidResponse(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "catalog service unreachable: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "catalog service returned invalid response: {message}")
            }
        }
    }
}

impl Error for CatalogError {}

pub trait InstallationCatalog {
    fn circuit_kinds(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
    fn installation_methods(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Catalog built from the codes the core knows about.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl InstallationCatalog for StaticCatalog {
    fn circuit_kinds(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(CircuitKind::ALL
            .iter()
            .map(|kind| entry(kind.code(), kind.description()))
            .collect())
    }

    fn installation_methods(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(InstallationMethod::ALL
            .iter()
            .map(|method| entry(method.code(), method.description()))
            .collect())
    }
}

fn entry(code: &str, description: &str) -> CatalogEntry {
    CatalogEntry {
        code: code.to_string(),
        description: description.to_string(),
    }
}
