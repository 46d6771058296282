pub mod dates;
pub mod normalize;

pub use dates::{DateResolver, date_key, parse_date};
pub use normalize::{
    clean_text, normalize_category, normalize_gender, normalize_phone, normalize_postal_code,
    normalize_vehicle_type, title_case,
};
