//! Person (customer) types and caller identity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{PersonId, TerminalId};

/// Individual customer data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalProfile {
    /// National id (cedula)
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub occupation: Option<String>,
    pub nationality: String,
    pub address: Option<String>,
}

/// Organization customer data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JuridicalProfile {
    /// Tax id (RUC)
    pub tax_id: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub incorporated_on: NaiveDate,
    pub company_type: String,
    pub legal_representative: Option<String>,
    pub address: Option<String>,
}

/// Exactly one profile per person, fixed at registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonProfile {
    Natural(NaturalProfile),
    Juridical(JuridicalProfile),
}

impl PersonProfile {
    pub fn display_name(&self) -> String {
        match self {
            PersonProfile::Natural(p) => format!("{} {}", p.first_name, p.last_name),
            PersonProfile::Juridical(p) => p.legal_name.clone(),
        }
    }
}

/// Contact data common to both profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    pub net_worth: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub contact: Contact,
    pub password_hash: Option<String>,
    pub registered_at: DateTime<Utc>,
    /// Soft-disable flag; persons are never deleted
    pub active: bool,
    pub profile: PersonProfile,
}

impl Person {
    pub fn view(&self) -> PersonView {
        PersonView {
            id: self.id,
            name: self.profile.display_name(),
            contact: self.contact.clone(),
            registered_at: self.registered_at,
            active: self.active,
            profile: self.profile.clone(),
        }
    }
}

/// Person data without the credential
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonView {
    pub id: PersonId,
    pub name: String,
    pub contact: Contact,
    pub registered_at: DateTime<Utc>,
    pub active: bool,
    pub profile: PersonProfile,
}

/// Proof that a person authenticated
///
/// Replaces ambient session state: operations acting for a customer receive
/// it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub person: PersonId,
    pub issued_at: DateTime<Utc>,
}

/// Who is performing a teller operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// Bank staff; may operate any account
    Teller,
    /// An unattended terminal acting on already authenticated input
    Terminal(TerminalId),
    /// A logged-in customer; may only operate their own accounts
    Customer(Identity),
}

impl Actor {
    pub fn terminal(&self) -> Option<TerminalId> {
        match self {
            Actor::Terminal(id) => Some(*id),
            _ => None,
        }
    }
}
