use crate::application::coordinator::Purchase;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseType {
    Category,
    Gift,
    Subscription,
}

/// One row of a purchases file: `type, user, item, recipient`.
///
/// `item` is a category id for `category` and `gift`, a subscription id for
/// `subscription`. `recipient` is only read for `gift`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PurchaseRecord {
    pub r#type: PurchaseType,
    pub user: u64,
    pub item: u64,
    pub recipient: Option<u64>,
}

impl TryFrom<PurchaseRecord> for Purchase {
    type Error = LedgerError;

    fn try_from(record: PurchaseRecord) -> Result<Self> {
        match record.r#type {
            PurchaseType::Category => Ok(Purchase::Category {
                user_id: record.user,
                category_id: record.item,
            }),
            PurchaseType::Gift => {
                let recipient_id = record.recipient.ok_or_else(|| {
                    LedgerError::ValidationError("gift requires a recipient".to_string())
                })?;
                Ok(Purchase::Gift {
                    payer_id: record.user,
                    category_id: record.item,
                    recipient_id,
                })
            }
            PurchaseType::Subscription => Ok(Purchase::Subscription {
                user_id: record.user,
                subscription_id: record.item,
            }),
        }
    }
}

/// Reads purchase requests from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths, so
/// the trailing `recipient` column may be left off entirely.
pub struct PurchaseReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PurchaseReader<R> {
    /// Creates a new `PurchaseReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads rows and converts them into purchases. A malformed row yields
    /// an error item and reading continues with the next one.
    pub fn purchases(self) -> impl Iterator<Item = Result<Purchase>> {
        self.reader.into_deserialize().map(|result| {
            let record: PurchaseRecord = result.map_err(LedgerError::from)?;
            Purchase::try_from(record)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "type, user, item, recipient\n\
                    category, 1, 10, \n\
                    gift, 1, 10, 2\n\
                    subscription, 2, 20";
        let reader = PurchaseReader::new(data.as_bytes());
        let results: Vec<Result<Purchase>> = reader.purchases().collect();

        assert_eq!(results.len(), 3);
        assert_eq!(
            *results[0].as_ref().unwrap(),
            Purchase::Category {
                user_id: 1,
                category_id: 10
            }
        );
        assert_eq!(
            *results[1].as_ref().unwrap(),
            Purchase::Gift {
                payer_id: 1,
                category_id: 10,
                recipient_id: 2
            }
        );
        assert_eq!(
            *results[2].as_ref().unwrap(),
            Purchase::Subscription {
                user_id: 2,
                subscription_id: 20
            }
        );
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, user, item, recipient\nrefund, 1, 1, \ncategory, 1, 2, ";
        let reader = PurchaseReader::new(data.as_bytes());
        let results: Vec<Result<Purchase>> = reader.purchases().collect();

        assert!(matches!(results[0], Err(LedgerError::CsvError(_))));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_gift_without_recipient() {
        let data = "type, user, item, recipient\ngift, 1, 10, ";
        let reader = PurchaseReader::new(data.as_bytes());
        let results: Vec<Result<Purchase>> = reader.purchases().collect();

        assert!(matches!(results[0], Err(LedgerError::ValidationError(_))));
    }

    #[test]
    fn test_negative_ids_rejected() {
        let data = "type, user, item, recipient\ncategory, -1, 10, ";
        let reader = PurchaseReader::new(data.as_bytes());
        let results: Vec<Result<Purchase>> = reader.purchases().collect();

        assert!(results[0].is_err());
    }
}
