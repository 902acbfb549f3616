//! Person registry
//!
//! Registers natural and juridical customers, enforces uniqueness of their
//! email and national/tax id, and turns a login into an explicit [`Identity`].

use std::sync::Arc;

use tracing::{info, warn};

use super::journal::LedgerEvent;
use super::ledger::Ledger;
use super::ledger_store::{lock, person_key};
use crate::types::{
    BankError, BankResult, Contact, Identity, JuridicalProfile, NaturalProfile, Person, PersonId,
    PersonProfile, PersonView,
};

/// Login fields tried in order by [`PersonRegistry::authenticate`]
const LOGIN_FIELDS: [&str; 3] = ["email", "national_id", "tax_id"];

fn require(field: &'static str, value: &str) -> BankResult<()> {
    if value.trim().is_empty() {
        return Err(BankError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_contact(contact: &Contact) -> BankResult<()> {
    require("phone", &contact.phone)?;
    require("email", &contact.email)?;
    if !contact.email.contains('@') {
        return Err(BankError::validation("email", "must be an email address"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PersonRegistry {
    ledger: Arc<Ledger>,
}

impl PersonRegistry {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Register an individual customer
    ///
    /// # Errors
    ///
    /// - `Validation` if a required field is blank
    /// - `Conflict` if the email or national id is already registered
    /// - `Storage` if the journal cannot be written
    pub fn register_natural(
        &self,
        profile: NaturalProfile,
        contact: Contact,
        password: Option<&str>,
    ) -> BankResult<PersonView> {
        require("national_id", &profile.national_id)?;
        require("first_name", &profile.first_name)?;
        require("last_name", &profile.last_name)?;
        let profile = NaturalProfile {
            nationality: match profile.nationality.trim() {
                "" => "Ecuatoriana".to_string(),
                other => other.to_string(),
            },
            ..profile
        };
        let key = ("national_id", profile.national_id.clone());
        self.register(PersonProfile::Natural(profile), key, contact, password)
    }

    /// Register an organization
    ///
    /// Same errors as [`PersonRegistry::register_natural`], with the tax id as
    /// the unique key.
    pub fn register_juridical(
        &self,
        profile: JuridicalProfile,
        contact: Contact,
        password: Option<&str>,
    ) -> BankResult<PersonView> {
        require("tax_id", &profile.tax_id)?;
        require("legal_name", &profile.legal_name)?;
        require("company_type", &profile.company_type)?;
        let key = ("tax_id", profile.tax_id.clone());
        self.register(PersonProfile::Juridical(profile), key, contact, password)
    }

    fn register(
        &self,
        profile: PersonProfile,
        (id_field, id_value): (&'static str, String),
        contact: Contact,
        password: Option<&str>,
    ) -> BankResult<PersonView> {
        validate_contact(&contact)?;
        let password_hash = match password {
            Some(password) => {
                require("password", password)?;
                Some(self.ledger.hasher().hash(password)?)
            }
            None => None,
        };

        let store = self.ledger.store();
        let id = store.next_person_id();
        let keys = [
            ("email", person_key("email", &contact.email), contact.email.clone()),
            (id_field, person_key(id_field, &id_value), id_value),
        ];

        let mut claimed: Vec<String> = Vec::with_capacity(keys.len());
        for (field, key, value) in &keys {
            let field = *field;
            if !store.person_keys().claim(key, id) {
                for key in &claimed {
                    store.person_keys().release(key.as_str());
                }
                warn!(field, value = %value, "registration rejected: duplicate key");
                return Err(BankError::conflict("Person", field, value));
            }
            claimed.push(key.clone());
        }

        let person = Person {
            id,
            contact,
            password_hash,
            registered_at: self.ledger.now(),
            active: true,
            profile,
        };
        let event = LedgerEvent::PersonSaved {
            person: person.clone(),
        };
        if let Err(e) = self.ledger.record(&event) {
            for key in &claimed {
                store.person_keys().release(key.as_str());
            }
            return Err(e);
        }

        let view = person.view();
        store.put_person(person);
        info!(person = id, name = %view.name, "person registered");
        Ok(view)
    }

    pub fn get(&self, id: PersonId) -> BankResult<PersonView> {
        Ok(self.ledger.store().person(id)?.view())
    }

    /// Person registered under an email, national id or tax id
    pub fn find(&self, login: &str) -> Option<PersonId> {
        let store = self.ledger.store();
        LOGIN_FIELDS
            .iter()
            .find_map(|field| store.find_person(field, login))
    }

    /// Check a login (email, national id or tax id) and password
    ///
    /// # Errors
    ///
    /// - `InvalidCredential` for an unknown login, a person without a
    ///   password, or a wrong password
    /// - `PersonInactive` if the credentials match a deactivated person
    pub fn authenticate(&self, login: &str, password: &str) -> BankResult<Identity> {
        let invalid = || BankError::InvalidCredential {
            login: login.to_string(),
        };
        let id = self.find(login).ok_or_else(invalid)?;
        let person = self.ledger.store().person(id)?;

        let matches = person
            .password_hash
            .as_deref()
            .is_some_and(|stored| self.ledger.hasher().verify(password, stored));
        if !matches {
            warn!(login, "authentication failed");
            return Err(invalid());
        }
        if !person.active {
            return Err(BankError::PersonInactive { person: id });
        }

        Ok(Identity {
            person: id,
            issued_at: self.ledger.now(),
        })
    }

    /// Replace a password after checking the current one
    ///
    /// A person registered without a password sets one with `current = None`.
    pub fn change_password(
        &self,
        id: PersonId,
        current: Option<&str>,
        new_password: &str,
    ) -> BankResult<()> {
        require("password", new_password)?;
        let handle = self.ledger.store().person_handle(id)?;
        let mut guard = lock(&handle);

        let verified = match (guard.password_hash.as_deref(), current) {
            (None, _) => true,
            (Some(stored), Some(current)) => self.ledger.hasher().verify(current, stored),
            (Some(_), None) => false,
        };
        if !verified {
            return Err(BankError::InvalidCredential {
                login: guard.contact.email.clone(),
            });
        }

        let mut updated = guard.clone();
        updated.password_hash = Some(self.ledger.hasher().hash(new_password)?);
        self.ledger.record(&LedgerEvent::PersonSaved {
            person: updated.clone(),
        })?;
        *guard = updated;
        info!(person = id, "password changed");
        Ok(())
    }

    /// Soft-disable a person; repeated calls are no-ops
    pub fn deactivate(&self, id: PersonId) -> BankResult<PersonView> {
        let handle = self.ledger.store().person_handle(id)?;
        let mut guard = lock(&handle);
        if !guard.active {
            return Ok(guard.view());
        }

        let mut updated = guard.clone();
        updated.active = false;
        self.ledger.record(&LedgerEvent::PersonSaved {
            person: updated.clone(),
        })?;
        *guard = updated;
        info!(person = id, "person deactivated");
        Ok(guard.view())
    }
}
