use campaign_core::types::{Customer, Vehicle};
use chrono::{Days, NaiveDate, TimeZone, Utc};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

pub fn days_ago(days: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(days)).unwrap()
}

/// A vehicle registered on June 1st of `year`, with no warranty or due date.
pub fn vehicle_with(year: i32, serviced_days_ago: Option<u64>, mileage: Option<u32>) -> Vehicle {
    Vehicle {
        id: 1,
        customer_id: 1,
        make: "Maruti".into(),
        model: "Swift".into(),
        year,
        registration_date: NaiveDate::from_ymd_opt(year, 6, 1),
        last_service_date: serviced_days_ago.map(days_ago),
        last_service_type: None,
        next_service_due: None,
        mileage,
        warranty_start: None,
        warranty_end: None,
    }
}

pub fn customer(id: i64, location: Option<&str>, mut vehicles: Vec<Vehicle>) -> Customer {
    for (idx, v) in vehicles.iter_mut().enumerate() {
        v.customer_id = id;
        v.id = id * 10 + idx as i64;
    }
    Customer {
        id,
        name: format!("Customer {id}"),
        email: format!("customer{id}@example.com"),
        phone: None,
        preferred_location: location.map(str::to_string),
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        vehicles,
    }
}
