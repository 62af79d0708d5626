use std::path::Path;
use std::str::FromStr;

use crate::core::pipeline::{SolidNocallStrategy, SolidRecalMode};

pub fn path(rawpath: &str) -> Result<(), String> {
    if !Path::new(&rawpath).exists() {
        Err(format!("{} doesn't exist or there is no permission to read it", rawpath))
    } else {
        Ok(())
    }
}

pub fn writable(_: &str) -> Result<(), String> {
    // no portable way to check writability without creating the file
    Ok(())
}

pub fn solid_recal_mode(value: &str) -> Result<(), String> {
    SolidRecalMode::from_str(value).map(|_| ())
}

pub fn solid_nocall_strategy(value: &str) -> Result<(), String> {
    SolidNocallStrategy::from_str(value).map(|_| ())
}

pub fn numeric<T>(low: T, upper: T) -> impl Fn(&str) -> Result<(), String>
where
    T: FromStr + std::fmt::Display + std::cmp::PartialOrd + Sized,
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    move |val: &str| -> Result<(), String> {
        let number = match val.parse::<T>() {
            Ok(number) => number,
            Err(_) => return Err(format!("failed to parse {}", val)),
        };
        if number < low || number > upper {
            return Err(format!("Value {} is expected to be inside [{}, {}] range", val, low, upper));
        }
        Ok(())
    }
}
