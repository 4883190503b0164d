//! Typed change events and their outbound wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use turf_types::{
    EconomicIndicators, FactionId, PriceChange, TerritoryId, Transaction, WorldEvent,
};

/// Event name subscribers register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// A territory's controlling faction changed.
    TerritoryControlChanged,
    /// A world event was created.
    EventCreated,
    /// A world event expired.
    EventExpired,
    /// One or more market prices moved.
    PricesUpdated,
    /// A purchase or sale completed.
    TransactionCompleted,
    /// The economic indicator set changed.
    EconomicIndicatorsUpdated,
}

impl ChangeKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::TerritoryControlChanged,
        Self::EventCreated,
        Self::EventExpired,
        Self::PricesUpdated,
        Self::TransactionCompleted,
        Self::EconomicIndicatorsUpdated,
    ];

    /// The wire name, e.g. `"territoryControlChanged"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TerritoryControlChanged => "territoryControlChanged",
            Self::EventCreated => "eventCreated",
            Self::EventExpired => "eventExpired",
            Self::PricesUpdated => "pricesUpdated",
            Self::TransactionCompleted => "transactionCompleted",
            Self::EconomicIndicatorsUpdated => "economicIndicatorsUpdated",
        }
    }
}

impl core::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of [`ChangeEvent::TerritoryControlChanged`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryControlChange {
    /// The territory that changed hands.
    pub territory_id: TerritoryId,
    /// Controller before the change.
    pub previous_faction: Option<FactionId>,
    /// Controller after the change.
    pub new_faction: Option<FactionId>,
}

/// A structured change emitted by a state domain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A territory's controller changed.
    TerritoryControlChanged(TerritoryControlChange),
    /// A world event became active.
    EventCreated(WorldEvent),
    /// A world event expired.
    EventExpired(WorldEvent),
    /// Prices that moved during a market tick.
    PricesUpdated(Vec<PriceChange>),
    /// A completed purchase or sale.
    TransactionCompleted(Transaction),
    /// The indicator set after an update.
    EconomicIndicatorsUpdated(EconomicIndicators),
}

impl ChangeEvent {
    /// The event name.
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::TerritoryControlChanged(_) => ChangeKind::TerritoryControlChanged,
            Self::EventCreated(_) => ChangeKind::EventCreated,
            Self::EventExpired(_) => ChangeKind::EventExpired,
            Self::PricesUpdated(_) => ChangeKind::PricesUpdated,
            Self::TransactionCompleted(_) => ChangeKind::TransactionCompleted,
            Self::EconomicIndicatorsUpdated(_) => ChangeKind::EconomicIndicatorsUpdated,
        }
    }

    /// Encode the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload cannot be encoded.
    pub fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::TerritoryControlChanged(change) => serde_json::to_value(change),
            Self::EventCreated(event) | Self::EventExpired(event) => serde_json::to_value(event),
            Self::PricesUpdated(changes) => serde_json::to_value(changes),
            Self::TransactionCompleted(tx) => serde_json::to_value(tx),
            Self::EconomicIndicatorsUpdated(indicators) => serde_json::to_value(indicators),
        }
    }
}

/// A published change with the time it was published.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// What changed.
    pub event: ChangeEvent,
    /// When the owning domain published it.
    pub at: DateTime<Utc>,
}

impl Change {
    /// Convert into the outbound `{type, data, timestamp}` shape.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload cannot be encoded.
    pub fn to_notification(&self) -> Result<Notification, serde_json::Error> {
        Ok(Notification {
            kind: self.event.kind(),
            data: self.event.data()?,
            timestamp: self.at,
        })
    }
}

/// Outbound notification delivered to real-time observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Event name.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Event payload.
    pub data: serde_json::Value,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_camel_case_name() {
        for kind in ChangeKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_owned()));
        }
    }

    #[test]
    fn notification_has_type_data_timestamp() {
        let change = Change {
            event: ChangeEvent::TerritoryControlChanged(TerritoryControlChange {
                territory_id: TerritoryId::from("docks"),
                previous_faction: None,
                new_faction: Some(FactionId::from("faction-7")),
            }),
            at: Utc::now(),
        };
        let json = serde_json::to_value(change.to_notification().unwrap()).unwrap();
        assert_eq!(json["type"], "territoryControlChanged");
        assert_eq!(json["data"]["territoryId"], "docks");
        assert!(json["data"]["previousFaction"].is_null());
        assert_eq!(json["data"]["newFaction"], "faction-7");
        assert!(json["timestamp"].is_string());
        assert!(json["data"].get("previous_faction").is_none());
    }
}
