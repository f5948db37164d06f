use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::{
    query_date, query_uuid, require_non_negative, require_optional_text, require_range, require_slot_label, require_text,
    FieldError, Validate,
};
use crate::database::models::{ExpenseItem, Permission, WeekdayPrices};
use crate::error::ApiError;
use crate::scope::{ListParams, Menu};

/// `{ "ids": [...] }` body of the batch-remove endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct IdsPayload {
    pub ids: Vec<Uuid>,
}

impl Validate for IdsPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.ids.is_empty() {
            return Err(ApiError::validation("ids", "ids must contain at least one id"));
        }
        Ok(())
    }
}

/// `?id=` of the single-record endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawIdQuery")]
pub struct IdQuery {
    pub id: Uuid,
}

// Query structs convert from all-string forms so a malformed value names its parameter

#[derive(Deserialize)]
struct RawIdQuery {
    id: Option<String>,
}

impl TryFrom<RawIdQuery> for IdQuery {
    type Error = FieldError;

    fn try_from(raw: RawIdQuery) -> Result<Self, Self::Error> {
        Ok(Self { id: query_uuid("id", &raw.id)? })
    }
}

impl Validate for IdQuery {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

impl Validate for ListParams {
    // checked while the filter is built
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

fn validate_permissions(permissions: &[Permission]) -> Result<(), ApiError> {
    for permission in permissions {
        if Menu::parse(&permission.menu).is_none() {
            return Err(ApiError::validation(
                "permissions",
                format!("Unknown menu '{}'", permission.menu),
            ));
        }
    }
    Ok(())
}

// Roles

#[derive(Debug, Clone, Deserialize)]
pub struct AddRoleRequest {
    pub name: String,
    pub city: Option<Uuid>,
    pub venue: Option<Uuid>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub is_active: Option<bool>,
}

impl Validate for AddRoleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("name", &self.name)?;
        if self.venue.is_some() && self.city.is_none() {
            return Err(ApiError::validation("city", "city is required when a venue is given"));
        }
        validate_permissions(&self.permissions)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub permissions: Option<Vec<Permission>>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateRoleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_optional_text("name", &self.name)?;
        match &self.permissions {
            Some(permissions) => validate_permissions(permissions),
            None => Ok(()),
        }
    }
}

// Venues

#[derive(Debug, Clone, Deserialize)]
pub struct AddVenueRequest {
    pub name: String,
    pub address: String,
    pub city: Uuid,
    #[serde(default)]
    pub sports: Vec<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub venue_type: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_location(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ApiError> {
    if let Some(lat) = latitude {
        require_range("latitude", lat, -90.0, 90.0)?;
    }
    if let Some(lng) = longitude {
        require_range("longitude", lng, -180.0, 180.0)?;
    }
    Ok(())
}

impl Validate for AddVenueRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("name", &self.name)?;
        require_text("address", &self.address)?;
        validate_location(self.latitude, self.longitude)
    }
}

/// Scalar fields of the multipart `update-venue` form. Media parts are
/// handled separately by the media store.
#[derive(Debug, Clone, Default)]
pub struct UpdateVenueRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<Uuid>,
    pub sports: Option<Vec<Uuid>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub venue_type: Option<String>,
    pub is_active: Option<bool>,
    /// Existing image paths to retain; `None` keeps all
    pub keep_images: Option<Vec<String>>,
    pub keep_videos: Option<Vec<String>>,
}

impl UpdateVenueRequest {
    /// Apply one text part of the form
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ApiError> {
        let value = value.trim();
        match name {
            "id" => self.id = Some(parse_uuid(name, value)?),
            "name" => self.name = Some(value.to_string()),
            "address" => self.address = Some(value.to_string()),
            "city" => self.city = Some(parse_uuid(name, value)?),
            "sports" => self.sports = Some(parse_list(name, value, |s| parse_uuid(name, s))?),
            "latitude" => self.latitude = Some(parse_number(name, value)?),
            "longitude" => self.longitude = Some(parse_number(name, value)?),
            "venue_type" => self.venue_type = Some(value.to_string()),
            "is_active" => {
                self.is_active = Some(match value {
                    "true" => true,
                    "false" => false,
                    _ => return Err(ApiError::validation(name, "is_active must be true or false")),
                })
            }
            "keep_images" => self.keep_images = Some(parse_list(name, value, |s| Ok(s.to_string()))?),
            "keep_videos" => self.keep_videos = Some(parse_list(name, value, |s| Ok(s.to_string()))?),
            other => tracing::debug!("Ignoring unknown update-venue field '{}'", other),
        }
        Ok(())
    }
}

impl Validate for UpdateVenueRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.id.is_none() {
            return Err(ApiError::validation("id", "id is required"));
        }
        require_optional_text("name", &self.name)?;
        require_optional_text("address", &self.address)?;
        validate_location(self.latitude, self.longitude)
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::validation(field, format!("{} must be a valid id", field)))
}

fn parse_number(field: &str, value: &str) -> Result<f64, ApiError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ApiError::validation(field, format!("{} must be a number", field)))
}

/// Form lists arrive either as a JSON array or comma separated
fn parse_list<T>(field: &str, value: &str, item: impl Fn(&str) -> Result<T, ApiError>) -> Result<Vec<T>, ApiError> {
    if value.starts_with('[') {
        let raw: Vec<String> = serde_json::from_str(value)
            .map_err(|_| ApiError::validation(field, format!("{} must be a JSON array of strings", field)))?;
        return raw.iter().map(|s| item(s.trim())).collect();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(item)
        .collect()
}

// Slot times

#[derive(Debug, Clone, Deserialize)]
pub struct AddSlotTimeRequest {
    pub city: Uuid,
    pub venue: Uuid,
    pub ground: Uuid,
    pub slot: String,
    pub price: WeekdayPrices,
    pub is_active: Option<bool>,
}

fn validate_prices(prices: &WeekdayPrices) -> Result<(), ApiError> {
    for (day, amount) in prices.iter() {
        require_non_negative(&format!("price.{}", day), amount)?;
    }
    Ok(())
}

impl Validate for AddSlotTimeRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_slot_label("slot", &self.slot)?;
        validate_prices(&self.price)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSlotTimeRequest {
    pub id: Uuid,
    pub slot: Option<String>,
    pub price: Option<WeekdayPrices>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateSlotTimeRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(slot) = &self.slot {
            require_slot_label("slot", slot)?;
        }
        if let Some(price) = &self.price {
            validate_prices(price)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawAvailableSlotsQuery")]
pub struct AvailableSlotsQuery {
    pub ground: Uuid,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
struct RawAvailableSlotsQuery {
    ground: Option<String>,
    date: Option<String>,
}

impl TryFrom<RawAvailableSlotsQuery> for AvailableSlotsQuery {
    type Error = FieldError;

    fn try_from(raw: RawAvailableSlotsQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            ground: query_uuid("ground", &raw.ground)?,
            date: query_date("date", &raw.date)?,
        })
    }
}

impl Validate for AvailableSlotsQuery {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawEventSlotsQuery")]
pub struct EventSlotsQuery {
    pub ground: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
struct RawEventSlotsQuery {
    ground: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl TryFrom<RawEventSlotsQuery> for EventSlotsQuery {
    type Error = FieldError;

    fn try_from(raw: RawEventSlotsQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            ground: query_uuid("ground", &raw.ground)?,
            start_date: query_date("start_date", &raw.start_date)?,
            end_date: query_date("end_date", &raw.end_date)?,
        })
    }
}

impl Validate for EventSlotsQuery {
    fn validate(&self) -> Result<(), ApiError> {
        if self.end_date < self.start_date {
            return Err(ApiError::validation("end_date", "end_date must not be before start_date"));
        }
        Ok(())
    }
}

// Venue expenses

#[derive(Debug, Clone, Deserialize)]
pub struct AddVenueExpenseRequest {
    pub city: Uuid,
    pub venue: Uuid,
    pub month: i16,
    pub year: i32,
    pub expenses: Vec<ExpenseItem>,
}

fn validate_period(month: i16, year: i32) -> Result<(), ApiError> {
    if !(1..=12).contains(&month) {
        return Err(ApiError::validation("month", "month must be between 1 and 12"));
    }
    if !(2000..=2100).contains(&year) {
        return Err(ApiError::validation("year", "year must be between 2000 and 2100"));
    }
    Ok(())
}

fn validate_items(items: &[ExpenseItem]) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::validation("expenses", "expenses must contain at least one item"));
    }
    for item in items {
        require_text("expenses.description", &item.description)?;
        require_non_negative("expenses.amount", item.amount)?;
    }
    Ok(())
}

impl Validate for AddVenueExpenseRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_period(self.month, self.year)?;
        validate_items(&self.expenses)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVenueExpenseRequest {
    pub id: Uuid,
    pub month: Option<i16>,
    pub year: Option<i32>,
    pub expenses: Option<Vec<ExpenseItem>>,
}

impl Validate for UpdateVenueExpenseRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(month) = self.month {
            validate_period(month, self.year.unwrap_or(2000))?;
        }
        if let Some(year) = self.year {
            validate_period(self.month.unwrap_or(1), year)?;
        }
        match &self.expenses {
            Some(items) => validate_items(items),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(err: ApiError) -> String {
        err.to_json()["data"]["field"].as_str().unwrap_or_default().to_string()
    }

    fn prices() -> serde_json::Value {
        json!({ "monday": 100, "tuesday": 100, "wednesday": 100, "thursday": 100,
                "friday": 100, "saturday": 150, "sunday": 150 })
    }

    #[test]
    fn slot_request_checks_label_and_prices() {
        let mut body = json!({
            "city": Uuid::new_v4(), "venue": Uuid::new_v4(), "ground": Uuid::new_v4(),
            "slot": "06:00-07:00", "price": prices()
        });
        let ok: AddSlotTimeRequest = serde_json::from_value(body.clone()).unwrap();
        assert!(ok.validate().is_ok());

        body["slot"] = json!("07:00-06:00");
        let bad: AddSlotTimeRequest = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(field(bad.validate().unwrap_err()), "slot");

        body["slot"] = json!("06:00-07:00");
        body["price"]["sunday"] = json!(-5);
        let bad: AddSlotTimeRequest = serde_json::from_value(body).unwrap();
        assert_eq!(field(bad.validate().unwrap_err()), "price.sunday");
    }

    #[test]
    fn expense_request_checks_period_and_items() {
        let base = json!({
            "city": Uuid::new_v4(), "venue": Uuid::new_v4(), "month": 13, "year": 2024,
            "expenses": [{ "description": "Floodlights", "amount": 1200.50 }]
        });
        let bad: AddVenueExpenseRequest = serde_json::from_value(base.clone()).unwrap();
        assert_eq!(field(bad.validate().unwrap_err()), "month");

        let mut empty = base;
        empty["month"] = json!(3);
        empty["expenses"] = json!([]);
        let bad: AddVenueExpenseRequest = serde_json::from_value(empty).unwrap();
        assert_eq!(field(bad.validate().unwrap_err()), "expenses");
    }

    #[test]
    fn role_permissions_must_name_known_menus() {
        let req: AddRoleRequest = serde_json::from_value(json!({
            "name": "Manager",
            "permissions": [{ "menu": "Bookings", "view": true }]
        }))
        .unwrap();
        assert_eq!(field(req.validate().unwrap_err()), "permissions");

        let req: AddRoleRequest = serde_json::from_value(json!({
            "name": "Manager",
            "venue": Uuid::new_v4(),
            "permissions": [{ "menu": "Slot_Times", "view": true }]
        }))
        .unwrap();
        assert_eq!(field(req.validate().unwrap_err()), "city");
    }

    #[test]
    fn empty_id_batch_rejected() {
        let req = IdsPayload { ids: vec![] };
        assert_eq!(field(req.validate().unwrap_err()), "ids");
    }

    #[test]
    fn venue_form_fields_parse() {
        let mut form = UpdateVenueRequest::default();
        let id = Uuid::new_v4();
        form.set_field("id", &id.to_string()).unwrap();
        form.set_field("keep_images", "[\"venues/a.png\",\"venues/b.png\"]").unwrap();
        form.set_field("latitude", "12.97").unwrap();
        form.set_field("is_active", "false").unwrap();
        assert_eq!(form.id, Some(id));
        assert_eq!(form.keep_images.as_ref().map(Vec::len), Some(2));
        assert_eq!(form.is_active, Some(false));
        assert!(form.validate().is_ok());

        assert_eq!(field(form.set_field("latitude", "north").unwrap_err()), "latitude");
        form.latitude = Some(120.0);
        assert_eq!(field(form.validate().unwrap_err()), "latitude");
    }

    #[test]
    fn event_range_must_be_ordered() {
        let q = EventSlotsQuery {
            ground: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
        };
        assert_eq!(field(q.validate().unwrap_err()), "end_date");
    }
}
