use chrono::{DateTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Price of a slot for each day of the week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPrices {
    pub monday: Decimal,
    pub tuesday: Decimal,
    pub wednesday: Decimal,
    pub thursday: Decimal,
    pub friday: Decimal,
    pub saturday: Decimal,
    pub sunday: Decimal,
}

impl WeekdayPrices {
    pub fn for_weekday(&self, day: Weekday) -> Decimal {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Decimal)> {
        [
            ("monday", self.monday),
            ("tuesday", self.tuesday),
            ("wednesday", self.wednesday),
            ("thursday", self.thursday),
            ("friday", self.friday),
            ("saturday", self.saturday),
            ("sunday", self.sunday),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SlotTime {
    pub id: Uuid,
    pub ground_id: Uuid,
    pub venue_id: Uuid,
    pub city_id: Uuid,
    /// `HH:MM-HH:MM`
    pub slot: String,
    #[sqlx(json)]
    pub price: WeekdayPrices,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prices_accept_numbers_and_pick_weekday() {
        let prices: WeekdayPrices = serde_json::from_value(json!({
            "monday": 500, "tuesday": 500, "wednesday": 500, "thursday": 500,
            "friday": 650.5, "saturday": 800, "sunday": 800
        }))
        .unwrap();
        assert_eq!(prices.for_weekday(Weekday::Fri), Decimal::new(6505, 1));
        assert_eq!(prices.for_weekday(Weekday::Sun), Decimal::from(800));
        assert_eq!(prices.iter().count(), 7);
    }
}
