use flate2::read::GzDecoder;
use fs_err::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub fn is_title_case(string: &str) -> bool {
    let mut char_case = string.chars().map(|x| x.is_uppercase());

    char_case.next().unwrap_or(false) && !char_case.any(|x| x)
}

/// Replaces every run of ascii digits with a single `#` so numbers share features.
pub fn normalize_digits(string: &str) -> String {
    let mut out = String::with_capacity(string.len());
    let mut in_number = false;

    for c in string.chars() {
        if c.is_ascii_digit() {
            if !in_number {
                out.push('#');
            }
            in_number = true;
        } else {
            out.push(c);
            in_number = false;
        }
    }

    out
}

/// Opens a file for buffered reading, decompressing it if the path ends in `.gz`.
pub fn open_maybe_gz<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn Read>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    if path.extension().map_or(false, |x| x == "gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
