//! Package & Add-on Catalog
//!
//! What the studio sells. Prices are whole AUD.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A selectable add-on (upsell)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    /// Stable identifier (e.g., "logo")
    pub id: String,

    /// Display name, shown on the Stripe line item
    pub name: String,

    /// Price in whole currency units
    pub price: u64,
}

impl AddOn {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
        }
    }
}

/// A website package
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Display name (e.g., "Pro")
    pub name: String,

    /// Base price in whole currency units
    pub price: u64,

    /// Short pitch
    pub description: String,
}

/// The full offer: packages plus add-ons
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub packages: Vec<Package>,
    pub add_ons: Vec<AddOn>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The packages and add-ons currently on the site
    pub fn standard() -> Self {
        Self {
            packages: vec![
                Package {
                    name: "Basic".into(),
                    price: 500,
                    description: "Perfect for small businesses getting online".into(),
                },
                Package {
                    name: "Pro".into(),
                    price: 1000,
                    description: "Best for growing businesses".into(),
                },
            ],
            add_ons: vec![
                AddOn::new("logo", "Professional Logo Design", 250),
                AddOn::new("rush", "Rush Delivery", 400),
                AddOn::new("content", "Professional Content Writing", 225),
                AddOn::new("seo", "Advanced SEO Package", 300),
            ],
        }
    }

    /// Find a package by name (case-insensitive)
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Find an add-on by id
    pub fn add_on(&self, id: &str) -> Option<&AddOn> {
        self.add_ons.iter().find(|a| a.id == id)
    }

    /// Check that a client-submitted order matches what we actually sell
    pub fn verify(&self, package_name: &str, base_price: u64, add_ons: &[AddOn]) -> Result<()> {
        let package = self
            .package(package_name)
            .ok_or_else(|| CoreError::CatalogMismatch(format!("unknown package '{package_name}'")))?;

        if package.price != base_price {
            return Err(CoreError::CatalogMismatch(format!(
                "package '{}' costs {}, order says {}",
                package.name, package.price, base_price
            )));
        }

        for selected in add_ons {
            let listed = self
                .add_on(&selected.id)
                .ok_or_else(|| CoreError::CatalogMismatch(format!("unknown add-on '{}'", selected.id)))?;

            if listed.price != selected.price {
                return Err(CoreError::CatalogMismatch(format!(
                    "add-on '{}' costs {}, order says {}",
                    listed.id, listed.price, selected.price
                )));
            }
        }

        Ok(())
    }
}
