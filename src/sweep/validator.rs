use super::types::{ArgumentError, ValidationResult};

/// Validates a client-supplied `hackrf_sweep` argument list.
///
/// The grammar mirrors the tool's own option table: `-1`, `-B` and `-I` are
/// value-less flags, every other known option takes exactly one following
/// value. The scan is strictly left-to-right and stops at the first failure,
/// so the caller can always tell the client which exact token was at fault.
///
/// Checks are purely syntactic and range-based. The validator never probes
/// device availability or the filesystem, and it never rewrites the list:
/// an accepted list is passed to the spawn call verbatim.
pub fn validate_args(args: &[String]) -> ValidationResult {
    if args.is_empty() {
        return ValidationResult::Rejected(ArgumentError {
            option: None,
            value: None,
            reason: String::from("no arguments provided"),
        });
    }

    let mut i = 0;
    while i < args.len() {
        let option = args[i].as_str();

        // One-shot mode, binary output, binary inverse FFT output: flags only.
        if matches!(option, "-1" | "-B" | "-I") {
            i += 1;
            continue;
        }

        if !matches!(
            option,
            "-d" | "-a" | "-f" | "-p" | "-l" | "-g" | "-w" | "-W" | "-P" | "-N" | "-r"
        ) {
            return rejected(option, None, "unknown option");
        }

        // The next token is consumed as the value even if it looks like an
        // option itself; hackrf_sweep's getopt does the same.
        let Some(value) = args.get(i + 1) else {
            return rejected(option, None, "missing value");
        };

        let check = match option {
            "-d" => check_serial(value),
            "-a" => check_bit(value, "RX RF amplifier"),
            "-p" => check_bit(value, "antenna port power"),
            "-f" => check_frequency_range(value),
            "-l" => check_stepped_gain(value, 40, 8, "RX LNA (IF) gain"),
            "-g" => check_stepped_gain(value, 62, 2, "RX VGA (baseband) gain"),
            "-w" => check_bin_width(value),
            "-P" => check_plan_type(value),
            "-N" => check_sweep_count(value),
            // -W (wisdom file) and -r (output file) accept any string; the
            // paths are not verified to exist.
            _ => Ok(()),
        };

        if let Err(reason) = check {
            return rejected(option, Some(value), reason);
        }

        i += 2;
    }

    ValidationResult::Accepted(args.to_vec())
}

fn rejected(option: &str, value: Option<&str>, reason: impl Into<String>) -> ValidationResult {
    ValidationResult::Rejected(ArgumentError {
        option: Some(option.to_string()),
        value: value.map(str::to_string),
        reason: reason.into(),
    })
}

fn check_serial(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(String::from("serial number must not be empty"));
    }
    Ok(())
}

fn check_bit(value: &str, what: &str) -> Result<(), String> {
    match value {
        "0" | "1" => Ok(()),
        _ => Err(format!("{} enable must be 0 or 1", what)),
    }
}

fn check_frequency_range(value: &str) -> Result<(), String> {
    const FORMAT: &str = "frequency range must use the form freq_min:freq_max in MHz";

    let Some((min, max)) = value.split_once(':') else {
        return Err(String::from(FORMAT));
    };
    let (Ok(min), Ok(max)) = (min.trim().parse::<f64>(), max.trim().parse::<f64>()) else {
        return Err(String::from(FORMAT));
    };
    if min.is_nan() || max.is_nan() {
        return Err(String::from(FORMAT));
    }
    if min >= max {
        return Err(String::from("freq_min must be less than freq_max"));
    }
    Ok(())
}

fn check_stepped_gain(value: &str, max: i64, step: i64, what: &str) -> Result<(), String> {
    let in_range = value
        .parse::<i64>()
        .map(|gain| (0..=max).contains(&gain) && gain % step == 0)
        .unwrap_or(false);
    if !in_range {
        return Err(format!("{} must be 0-{}dB in {}dB steps", what, max, step));
    }
    Ok(())
}

fn check_bin_width(value: &str) -> Result<(), String> {
    let in_range = value
        .parse::<i64>()
        .map(|width| (2445..=5_000_000).contains(&width))
        .unwrap_or(false);
    if !in_range {
        return Err(String::from(
            "FFT bin width must be between 2445 and 5000000 Hz",
        ));
    }
    Ok(())
}

fn check_plan_type(value: &str) -> Result<(), String> {
    match value {
        "estimate" | "measure" | "patient" | "exhaustive" => Ok(()),
        _ => Err(String::from(
            "FFTW plan type must be one of estimate, measure, patient, exhaustive",
        )),
    }
}

fn check_sweep_count(value: &str) -> Result<(), String> {
    let positive = value.parse::<i64>().map(|n| n > 0).unwrap_or(false);
    if !positive {
        return Err(String::from("number of sweeps must be a positive integer"));
    }
    Ok(())
}
