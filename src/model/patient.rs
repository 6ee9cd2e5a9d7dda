// attendance-record: patient directory entries

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::wire;

/// Maximum number of digits in a CPF (Brazilian taxpayer id)
const CPF_DIGITS: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

/// Patient as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PatientWire")]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    #[serde(serialize_with = "birth_date::serialize")]
    pub birth_date: Option<NaiveDate>,
    pub cpf: Option<String>,
    pub contacts: Vec<PatientContact>,
}

impl Patient {
    pub fn primary_contact(&self) -> Option<&PatientContact> {
        self.contacts
            .iter()
            .find(|c| c.primary)
            .or_else(|| self.contacts.first())
    }
}

/// Backend shape. The tax id has shipped under several keys.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientWire {
    #[serde(default, deserialize_with = "wire::null_as_zero")]
    id: i64,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    cpf: Option<String>,
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    document_number: Option<String>,
    #[serde(default)]
    tax_id: Option<String>,
    #[serde(default)]
    contacts: Option<Vec<PatientContact>>,
}

impl From<PatientWire> for Patient {
    fn from(w: PatientWire) -> Self {
        let cpf = [w.cpf, w.document, w.document_number, w.tax_id]
            .into_iter()
            .flatten()
            .find(|raw| !raw.trim().is_empty())
            .map(|raw| normalize_cpf(&raw))
            .filter(|digits| !digits.is_empty());

        Patient {
            id: w.id,
            full_name: w.full_name,
            birth_date: w.birth_date.as_deref().and_then(parse_birth_date),
            cpf,
            contacts: w.contacts.unwrap_or_default(),
        }
    }
}

/// Keep digits only, truncated to the CPF length.
pub fn normalize_cpf(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(CPF_DIGITS)
        .collect()
}

/// Birth dates are sometimes sent as full datetimes; only the date part counts.
fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    raw.get(..10).and_then(wire::parse_calendar_date)
}

mod birth_date {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&wire::format_calendar_date(d)),
            None => serializer.serialize_none(),
        }
    }
}
