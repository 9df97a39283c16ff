//! Downloadable starter CSV.

use csv::Writer;

pub const TEMPLATE_HEADERS: &[&str] = &[
    "vin",
    "year",
    "make",
    "model",
    "price",
    "trim",
    "mileage",
    "stock_number",
    "condition",
    "exterior_color",
    "interior_color",
    "transmission",
    "drivetrain",
    "body_style",
    "carfax_url",
    "primary_image_url",
    "image_urls",
    "is_featured_homepage",
    "featured_rank",
];

const SAMPLE_ROW: &[&str] = &[
    "1HGCM82633A123456",
    "2024",
    "Honda",
    "Accord",
    "32500",
    "Sport",
    "15000",
    "CMA001",
    "Used",
    "Black",
    "Black",
    "Automatic",
    "FWD",
    "Sedan",
    "",
    "",
    "",
    "false",
    "",
];

/// Header row plus one sample vehicle, CRLF-terminated.
pub fn csv_template() -> Result<String, csv::Error> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(TEMPLATE_HEADERS)?;
    writer.write_record(SAMPLE_ROW)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
