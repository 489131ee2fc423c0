//! EXIF and GPS metadata extraction from upload buffers.
//!
//! Extraction never fails: a buffer without a readable metadata block yields
//! an empty [`ExifData`] and a [`GpsExtraction`] with `has_gps = false`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;
use std::sync::Arc;

use crate::types::{ExifData, GpsData, GpsExtraction, GpsSource};

/// Extracts EXIF and GPS metadata from image buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract camera and exposure metadata.
    pub fn extract(&self, data: &[u8]) -> ExifData {
        let Some(exif) = read_exif(data) else {
            return ExifData::default();
        };

        ExifData {
            camera_make: get_string(&exif, Tag::Make),
            camera_model: get_string(&exif, Tag::Model),
            lens: get_string(&exif, Tag::LensModel).or_else(|| format_lens_spec(&exif)),
            iso: get_u32(&exif, Tag::PhotographicSensitivity),
            aperture: get_f64(&exif, Tag::FNumber).and_then(format_aperture),
            shutter_speed: get_f64(&exif, Tag::ExposureTime).and_then(format_shutter_speed),
            focal_length: get_f64(&exif, Tag::FocalLength).and_then(format_focal_length),
            focal_length_35mm: get_u32(&exif, Tag::FocalLengthIn35mmFilm),
            exposure_compensation: get_f64(&exif, Tag::ExposureBiasValue)
                .and_then(format_exposure_compensation),
            white_balance: get_u32(&exif, Tag::WhiteBalance)
                .map(|v| if v == 1 { "Manual" } else { "Auto" })
                .map(String::from),
            flash: get_u32(&exif, Tag::Flash).map(format_flash),
            metering_mode: get_u32(&exif, Tag::MeteringMode).map(format_metering_mode),
            capture_date: get_string(&exif, Tag::DateTimeOriginal)
                .or_else(|| get_string(&exif, Tag::DateTimeDigitized))
                .and_then(|s| parse_exif_datetime(&s)),
            image_width: get_u32(&exif, Tag::ImageWidth)
                .or_else(|| get_u32(&exif, Tag::PixelXDimension)),
            image_height: get_u32(&exif, Tag::ImageLength)
                .or_else(|| get_u32(&exif, Tag::PixelYDimension)),
            color_space: get_u32(&exif, Tag::ColorSpace)
                .filter(|&v| v == 1)
                .map(|_| "sRGB".to_string()),
            orientation: get_u32(&exif, Tag::Orientation),
        }
    }

    /// Extract the GPS block, if the image has coordinates.
    pub fn extract_gps(&self, data: &[u8]) -> GpsExtraction {
        let Some(exif) = read_exif(data) else {
            return GpsExtraction::none();
        };

        let latitude_ref = get_ref(&exif, Tag::GPSLatitudeRef);
        let longitude_ref = get_ref(&exif, Tag::GPSLongitudeRef);
        let latitude = get_dms(&exif, Tag::GPSLatitude).map(|dms| dms_to_decimal(dms, latitude_ref));
        let longitude = get_dms(&exif, Tag::GPSLongitude).map(|dms| dms_to_decimal(dms, longitude_ref));

        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return GpsExtraction::none();
        };

        let altitude_ref = get_u32(&exif, Tag::GPSAltitudeRef).map(|v| v as u8);
        let altitude = get_f64(&exif, Tag::GPSAltitude).map(|alt| {
            let alt = (alt * 10.0).round() / 10.0;
            if altitude_ref == Some(1) {
                -alt
            } else {
                alt
            }
        });

        GpsExtraction::found(GpsData {
            latitude,
            longitude,
            altitude,
            latitude_ref,
            longitude_ref,
            altitude_ref,
            gps_date: get_string(&exif, Tag::GPSDateStamp),
            gps_time: get_dms(&exif, Tag::GPSTimeStamp).map(format_gps_time),
            processing_method: GpsSource::Exif,
        })
    }

    /// Run EXIF and GPS extraction concurrently on the blocking pool.
    pub async fn extract_all(&self, data: Arc<Vec<u8>>) -> (ExifData, GpsExtraction) {
        let extractor = *self;
        let gps_data = Arc::clone(&data);
        let (exif, gps) = tokio::join!(
            tokio::task::spawn_blocking(move || extractor.extract(&data)),
            tokio::task::spawn_blocking(move || extractor.extract_gps(&gps_data)),
        );
        let exif = exif.unwrap_or_else(|e| {
            tracing::warn!("EXIF extraction task failed: {e}");
            ExifData::default()
        });
        let gps = gps.unwrap_or_else(|e| {
            tracing::warn!("GPS extraction task failed: {e}");
            GpsExtraction::none()
        });
        (exif, gps)
    }
}

fn read_exif(data: &[u8]) -> Option<Exif> {
    match Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => Some(exif),
        Err(e) => {
            tracing::debug!("No readable EXIF block: {e}");
            None
        }
    }
}

/// First ASCII value of a field, trimmed of NULs and whitespace.
fn get_string(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) => {
            let raw = values.first()?;
            let s = String::from_utf8_lossy(raw);
            let s = s.trim_matches(char::from(0)).trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        _ => None,
    }
}

fn get_u32(exif: &Exif, tag: Tag) -> Option<u32> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Byte(v) => v.first().map(|&x| x as u32),
        Value::Short(v) => v.first().map(|&x| x as u32),
        Value::Long(v) => v.first().copied(),
        _ => None,
    }
}

fn get_f64(exif: &Exif, tag: Tag) -> Option<f64> {
    let value = match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().map(|r| r.to_f64()),
        Value::SRational(v) => v.first().map(|r| r.to_f64()),
        Value::Short(v) => v.first().map(|&x| x as f64),
        Value::Long(v) => v.first().map(|&x| x as f64),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Three rationals: degrees/minutes/seconds or hours/minutes/seconds.
fn get_dms(exif: &Exif, tag: Tag) -> Option<[f64; 3]> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) if v.len() >= 3 => {
            let parts = [v[0].to_f64(), v[1].to_f64(), v[2].to_f64()];
            parts.iter().all(|p| p.is_finite()).then_some(parts)
        }
        _ => None,
    }
}

fn get_ref(exif: &Exif, tag: Tag) -> Option<char> {
    get_string(exif, tag)?
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
}

fn format_lens_spec(exif: &Exif) -> Option<String> {
    match &exif.get_field(Tag::LensSpecification, In::PRIMARY)?.value {
        Value::Rational(v) if v.len() >= 2 => {
            let min = v[0].to_f64().round();
            let max = v[1].to_f64().round();
            if !min.is_finite() || min <= 0.0 {
                None
            } else if (max - min).abs() < f64::EPSILON || !max.is_finite() {
                Some(format!("{min}mm"))
            } else {
                Some(format!("{min}-{max}mm"))
            }
        }
        _ => None,
    }
}

/// Decimal degrees from DMS, negative for S/W, rounded to 6 places.
pub fn dms_to_decimal(dms: [f64; 3], reference: Option<char>) -> f64 {
    let [degrees, minutes, seconds] = dms;
    let mut dd = degrees + minutes / 60.0 + seconds / 3600.0;
    if matches!(reference, Some('S') | Some('W')) {
        dd = -dd;
    }
    (dd * 1_000_000.0).round() / 1_000_000.0
}

/// `f/1.8`
pub fn format_aperture(f_number: f64) -> Option<String> {
    if f_number <= 0.0 {
        return None;
    }
    Some(format!("f/{}", (f_number * 100.0).round() / 100.0))
}

/// `2s` for exposures of a second or longer, otherwise `1/500`.
pub fn format_shutter_speed(seconds: f64) -> Option<String> {
    if seconds <= 0.0 {
        return None;
    }
    if seconds >= 1.0 {
        Some(format!("{}s", seconds.round()))
    } else {
        Some(format!("1/{}", (1.0 / seconds).round()))
    }
}

/// `50mm`
pub fn format_focal_length(mm: f64) -> Option<String> {
    if mm <= 0.0 {
        return None;
    }
    Some(format!("{}mm", mm.round()))
}

/// `+0.7 EV` / `-1.3 EV`; omitted at exactly zero.
pub fn format_exposure_compensation(bias: f64) -> Option<String> {
    if bias == 0.0 {
        return None;
    }
    Some(format!("{bias:+.1} EV"))
}

/// Lowest bit of the flash code says whether it fired.
pub fn format_flash(code: u32) -> String {
    let fired = code & 1 != 0;
    String::from(if fired { "Flash Fired" } else { "No Flash" })
}

fn format_metering_mode(code: u32) -> String {
    match code {
        1 => "Average",
        2 => "CenterWeightedAverage",
        3 => "Spot",
        4 => "MultiSpot",
        5 => "Pattern",
        6 => "Partial",
        255 => "Other",
        _ => "Unknown",
    }
    .to_string()
}

/// `HH:MM:SS` from an EXIF GPS timestamp, seconds truncated.
pub fn format_gps_time(hms: [f64; 3]) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        hms[0] as u32,
        hms[1] as u32,
        hms[2].floor() as u32
    )
}

/// Parse `"YYYY:MM:DD HH:MM:SS"`. A missing time part means midnight.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let mut parts = s.split_whitespace();
    let date_part = parts.next()?;
    let time_part = parts.next().unwrap_or("00:00:00");

    let date: Vec<u32> = date_part
        .split(':')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    let time: Vec<u32> = time_part
        .split(':')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    if date.len() != 3 {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(date[0] as i32, date[1], date[2])?;
    let time = NaiveTime::from_hms_opt(
        time.first().copied().unwrap_or(0),
        time.get(1).copied().unwrap_or(0),
        time.get(2).copied().unwrap_or(0),
    )?;
    Some(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational, SRational};

    fn rational(num: u32, denom: u32) -> Rational {
        Rational { num, denom }
    }

    fn ascii(s: &str) -> Value {
        Value::Ascii(vec![s.as_bytes().to_vec()])
    }

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn tiff_with(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for f in fields {
            writer.push_field(f);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, true).unwrap();
        buf.into_inner()
    }

    fn camera_fields() -> Vec<Field> {
        vec![
            field(Tag::Make, ascii("FUJIFILM")),
            field(Tag::Model, ascii("X-T5")),
            field(Tag::PhotographicSensitivity, Value::Short(vec![400])),
            field(Tag::FNumber, Value::Rational(vec![rational(28, 10)])),
            field(Tag::ExposureTime, Value::Rational(vec![rational(1, 500)])),
            field(Tag::FocalLength, Value::Rational(vec![rational(355, 10)])),
            field(
                Tag::ExposureBiasValue,
                Value::SRational(vec![SRational { num: -7, denom: 10 }]),
            ),
            field(Tag::Flash, Value::Short(vec![0x19])),
            field(Tag::ColorSpace, Value::Short(vec![1])),
            field(Tag::DateTimeOriginal, ascii("2024:01:15 14:30:45")),
        ]
    }

    fn gps_fields() -> Vec<Field> {
        vec![
            field(Tag::GPSLatitudeRef, ascii("S")),
            field(
                Tag::GPSLatitude,
                Value::Rational(vec![rational(2, 1), rational(19, 1), rational(3036, 100)]),
            ),
            field(Tag::GPSLongitudeRef, ascii("E")),
            field(
                Tag::GPSLongitude,
                Value::Rational(vec![rational(34, 1), rational(49, 1), rational(5, 1)]),
            ),
            field(Tag::GPSAltitudeRef, Value::Byte(vec![1])),
            field(Tag::GPSAltitude, Value::Rational(vec![rational(12344, 100)])),
            field(
                Tag::GPSTimeStamp,
                Value::Rational(vec![rational(6, 1), rational(5, 1), rational(959, 100)]),
            ),
            field(Tag::GPSDateStamp, ascii("2024:01:15")),
        ]
    }

    #[test]
    fn test_extract_camera_fields() {
        let data = tiff_with(&camera_fields());
        let exif = MetadataExtractor::new().extract(&data);
        assert_eq!(exif.camera_make.as_deref(), Some("FUJIFILM"));
        assert_eq!(exif.camera_model.as_deref(), Some("X-T5"));
        assert_eq!(exif.iso, Some(400));
        assert_eq!(exif.aperture.as_deref(), Some("f/2.8"));
        assert_eq!(exif.shutter_speed.as_deref(), Some("1/500"));
        assert_eq!(exif.focal_length.as_deref(), Some("36mm"));
        assert_eq!(exif.exposure_compensation.as_deref(), Some("-0.7 EV"));
        assert_eq!(exif.flash.as_deref(), Some("Flash Fired"));
        assert_eq!(exif.color_space.as_deref(), Some("sRGB"));
        assert_eq!(
            exif.capture_date,
            parse_exif_datetime("2024:01:15 14:30:45")
        );
    }

    #[test]
    fn test_extract_gps() {
        let data = tiff_with(&gps_fields());
        let result = MetadataExtractor::new().extract_gps(&data);
        assert!(result.has_gps);
        let gps = result.gps.unwrap();
        // 2 + 19/60 + 30.36/3600, southern hemisphere
        assert_eq!(gps.latitude, -2.3251);
        assert_eq!(gps.longitude, 34.818056);
        assert_eq!(gps.altitude, Some(-123.4));
        assert_eq!(gps.latitude_ref, Some('S'));
        assert_eq!(gps.gps_time.as_deref(), Some("06:05:09"));
        assert_eq!(gps.gps_date.as_deref(), Some("2024:01:15"));
        assert_eq!(gps.processing_method, GpsSource::Exif);
    }

    #[test]
    fn test_extract_without_gps() {
        let data = tiff_with(&camera_fields());
        let result = MetadataExtractor::new().extract_gps(&data);
        assert!(!result.has_gps);
        assert!(result.gps.is_none());
    }

    #[test]
    fn test_garbage_yields_empty() {
        let extractor = MetadataExtractor::new();
        assert!(extractor.extract(b"not an image").is_empty());
        assert!(extractor.extract(&[]).is_empty());
        assert_eq!(extractor.extract_gps(b"nope"), GpsExtraction::none());
    }

    #[tokio::test]
    async fn test_extract_all_runs_both() {
        let mut fields = camera_fields();
        fields.extend(gps_fields());
        let data = Arc::new(tiff_with(&fields));
        let (exif, gps) = MetadataExtractor::new().extract_all(data).await;
        assert_eq!(exif.iso, Some(400));
        assert!(gps.has_gps);
    }

    #[test]
    fn test_format_shutter_speed() {
        assert_eq!(format_shutter_speed(2.0).as_deref(), Some("2s"));
        assert_eq!(format_shutter_speed(1.0).as_deref(), Some("1s"));
        assert_eq!(format_shutter_speed(1.0 / 3.0).as_deref(), Some("1/3"));
        assert_eq!(format_shutter_speed(0.004).as_deref(), Some("1/250"));
        assert_eq!(format_shutter_speed(0.0), None);
    }

    #[test]
    fn test_format_aperture_and_focal_length() {
        assert_eq!(format_aperture(1.8).as_deref(), Some("f/1.8"));
        assert_eq!(format_aperture(8.0).as_deref(), Some("f/8"));
        assert_eq!(format_focal_length(49.6).as_deref(), Some("50mm"));
        assert_eq!(format_focal_length(0.0), None);
    }

    #[test]
    fn test_format_exposure_compensation() {
        assert_eq!(format_exposure_compensation(0.0), None);
        assert_eq!(format_exposure_compensation(0.667).as_deref(), Some("+0.7 EV"));
        assert_eq!(format_exposure_compensation(-1.0).as_deref(), Some("-1.0 EV"));
    }

    #[test]
    fn test_format_flash() {
        assert_eq!(format_flash(0), "No Flash");
        assert_eq!(format_flash(0x10), "No Flash");
        assert_eq!(format_flash(1), "Flash Fired");
    }

    #[test]
    fn test_dms_to_decimal_signs() {
        assert_eq!(dms_to_decimal([10.0, 30.0, 0.0], Some('N')), 10.5);
        assert_eq!(dms_to_decimal([10.0, 30.0, 0.0], Some('W')), -10.5);
        assert_eq!(dms_to_decimal([10.0, 30.0, 0.0], None), 10.5);
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2024:01:15 14:30:45").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:45");
        let midnight = parse_exif_datetime("2024:01:15").unwrap();
        assert_eq!(midnight.to_string(), "2024-01-15 00:00:00");
        assert!(parse_exif_datetime("garbage").is_none());
        assert!(parse_exif_datetime("2024:13:40 00:00:00").is_none());
    }

    #[test]
    fn test_format_gps_time() {
        assert_eq!(format_gps_time([6.0, 5.0, 9.59]), "06:05:09");
    }
}
