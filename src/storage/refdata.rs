//! Reference data: services, organizations, and profiles.
//!
//! These collections exist for display enrichment and the country filter.
//! They are loaded from a TOML seed file and upserted; a missing row never
//! fails a request operation — display degrades to raw ids.
//!
//! ```text
//! [[service]]
//! id = "passport-renewal"
//! name = "Renouvellement de passeport"
//! category = "passport"
//!
//! [[organization]]
//! id = "org-marseille"
//! name = "Consulat général à Marseille"
//! country = "FR"
//! city = "Marseille"
//!
//! [[profile]]
//! id = "prof-17"
//! full-name = "Awa Diallo"
//! email = "awa@example.org"
//! ```

use std::fs;
use std::path::Path;

use rusqlite::{OptionalExtension, params};
use serde::Deserialize;

use super::{Result, Storage};

/// A consular service offered by the network (passport, visa, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ConsularService {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// An embassy or consulate as an organizational unit handling requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(rename = "country")]
    pub country_code: String,
    pub city: Option<String>,
}

/// A citizen or agent profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
}

/// The parsed seed file.
#[derive(Debug, Default, Deserialize)]
pub struct RefDataFile {
    #[serde(default, rename = "service")]
    pub services: Vec<ConsularService>,
    #[serde(default, rename = "organization")]
    pub organizations: Vec<Organization>,
    #[serde(default, rename = "profile")]
    pub profiles: Vec<Profile>,
}

impl RefDataFile {
    /// Parses a reference-data seed file.
    pub fn load(path: &Path) -> std::result::Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read reference data {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("invalid reference data {}: {e}", path.display()))
    }
}

impl Storage {
    /// Upserts every record from a seed file. Returns the record count.
    pub fn import_refdata(&self, refdata: &RefDataFile) -> Result<usize> {
        for service in &refdata.services {
            self.upsert_service(service)?;
        }
        for organization in &refdata.organizations {
            self.upsert_organization(organization)?;
        }
        for profile in &refdata.profiles {
            self.upsert_profile(profile)?;
        }
        Ok(refdata.services.len() + refdata.organizations.len() + refdata.profiles.len())
    }

    pub fn upsert_service(&self, service: &ConsularService) -> Result<()> {
        self.conn.execute(
            "INSERT INTO services (id, name, category) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, category = excluded.category",
            params![&service.id, &service.name, &service.category],
        )?;
        Ok(())
    }

    pub fn upsert_organization(&self, organization: &Organization) -> Result<()> {
        self.conn.execute(
            "INSERT INTO organizations (id, name, country_code, city) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                 country_code = excluded.country_code, city = excluded.city",
            params![
                &organization.id,
                &organization.name,
                &organization.country_code,
                &organization.city,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (id, full_name, email) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET full_name = excluded.full_name,
                 email = excluded.email",
            params![&profile.id, &profile.full_name, &profile.email],
        )?;
        Ok(())
    }

    /// Looks up a service by id. `None` when unknown.
    pub fn service(&self, id: &str) -> Result<Option<ConsularService>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, category FROM services WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ConsularService {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        category: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Looks up an organization by id. `None` when unknown.
    pub fn organization(&self, id: &str) -> Result<Option<Organization>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, country_code, city FROM organizations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Organization {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        country_code: row.get(2)?,
                        city: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Looks up a profile by id. `None` when unknown.
    pub fn profile(&self, id: &str) -> Result<Option<Profile>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, full_name, email FROM profiles WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn test_storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    #[test]
    fn import_and_look_up() {
        let storage = test_storage();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
            [[service]]
            id = "passport-renewal"
            name = "Renouvellement de passeport"
            category = "passport"

            [[organization]]
            id = "org-marseille"
            name = "Consulat general a Marseille"
            country = "FR"
            city = "Marseille"

            [[profile]]
            id = "prof-17"
            full-name = "Awa Diallo"
            email = "awa@example.org"
            "#,
        )
        .unwrap();

        let refdata = RefDataFile::load(file.path()).unwrap();
        assert_eq!(storage.import_refdata(&refdata).unwrap(), 3);

        let service = storage.service("passport-renewal").unwrap().unwrap();
        assert_eq!(service.category, "passport");

        let organization = storage.organization("org-marseille").unwrap().unwrap();
        assert_eq!(organization.country_code, "FR");

        let profile = storage.profile("prof-17").unwrap().unwrap();
        assert_eq!(profile.email.as_deref(), Some("awa@example.org"));
    }

    #[test]
    fn import_is_an_upsert() {
        let storage = test_storage();
        let service = ConsularService {
            id: "visa".into(),
            name: "Visa".into(),
            category: "visa".into(),
        };
        storage.upsert_service(&service).unwrap();

        let renamed = ConsularService {
            name: "Visa long séjour".into(),
            ..service
        };
        storage.upsert_service(&renamed).unwrap();

        let loaded = storage.service("visa").unwrap().unwrap();
        assert_eq!(loaded.name, "Visa long séjour");
    }

    #[test]
    fn unknown_ids_are_none() {
        let storage = test_storage();
        assert!(storage.service("nope").unwrap().is_none());
        assert!(storage.organization("nope").unwrap().is_none());
        assert!(storage.profile("nope").unwrap().is_none());
    }
}
