use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{validate_inn, validate_non_empty_string};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A goods-turnover document as accepted by `lk/documents/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub description: Description,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    #[serde(with = "date_format")]
    pub production_date: NaiveDate,
    pub production_type: String,
    pub products: Vec<Product>,
    #[serde(with = "reg_date_format")]
    pub reg_date: DateTime<Utc>,
    pub reg_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub participant_inn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub certificate_document: String,
    #[serde(with = "date_format")]
    pub certificate_document_date: NaiveDate,
    pub certificate_document_number: String,
    pub owner_inn: String,
    pub producer_inn: String,
    #[serde(with = "date_format")]
    pub production_date: NaiveDate,
    pub tnved_code: String,
    pub uit_code: String,
    pub uitu_code: String,
}

impl Document {
    /// The placeholder document used for load runs and tests.
    pub fn sample() -> Self {
        let date = NaiveDate::from_ymd_opt(2020, 1, 23).unwrap_or_default();
        Document {
            description: Description {
                participant_inn: "participantInn".to_string(),
            },
            doc_id: "docId".to_string(),
            doc_status: "docStatus".to_string(),
            doc_type: "LP_INTRODUCE_GOODS".to_string(),
            import_request: true,
            owner_inn: "ownerInn".to_string(),
            participant_inn: "participantInn".to_string(),
            producer_inn: "producerInn".to_string(),
            production_date: date,
            production_type: "productionType".to_string(),
            products: vec![Product {
                certificate_document: "certificateDocument".to_string(),
                certificate_document_date: date,
                certificate_document_number: "certificateDocumentNumber".to_string(),
                owner_inn: "ownerInn".to_string(),
                producer_inn: "producerInn".to_string(),
                production_date: date,
                tnved_code: "tnvedCode".to_string(),
                uit_code: "uitCode".to_string(),
                uitu_code: "uituCode".to_string(),
            }],
            reg_date: date.and_time(NaiveTime::MIN).and_utc(),
            reg_number: "regNumber".to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty_string("doc_id", &self.doc_id).map_err(into_validation)?;
        validate_non_empty_string("doc_type", &self.doc_type).map_err(into_validation)?;
        validate_non_empty_string("participant_inn", &self.participant_inn)
            .map_err(into_validation)?;

        validate_inn("owner_inn", &self.owner_inn)?;
        validate_inn("participant_inn", &self.participant_inn)?;
        validate_inn("producer_inn", &self.producer_inn)?;
        validate_inn("description.participant_inn", &self.description.participant_inn)?;

        for (index, product) in self.products.iter().enumerate() {
            validate_inn(&format!("products[{}].owner_inn", index), &product.owner_inn)?;
            validate_inn(
                &format!("products[{}].producer_inn", index),
                &product.producer_inn,
            )?;
        }

        Ok(())
    }
}

fn into_validation(err: CrptError) -> CrptError {
    match err {
        CrptError::InvalidConfigValueError { field, reason, .. } => CrptError::ValidationError {
            message: format!("{}: {}", field, reason),
        },
        other => other,
    }
}

/// `yyyy-MM-dd`
pub mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// `yyyy-MM-dd HH:mm a z`, always rendered in UTC, e.g. `2020-01-23 00:00 AM UTC`.
pub mod reg_date_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M %p";
    const ZONE: &str = "UTC";

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{} {}", date.format(FORMAT), ZONE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let (datetime, zone) = s
            .trim()
            .rsplit_once(' ')
            .ok_or_else(|| serde::de::Error::custom(format!("missing time zone in '{}'", s)))?;

        if zone != ZONE {
            return Err(serde::de::Error::custom(format!(
                "unsupported time zone '{}', expected {}",
                zone, ZONE
            )));
        }

        NaiveDateTime::parse_from_str(datetime, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
