use std::error::Error;

use qrstage::{decode, read_format, read_version, ECLevel, QRBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let text = std::env::args().nth(1).unwrap_or_else(|| "01234567".to_string());
    let qr = QRBuilder::new(&text).ec_level(ECLevel::H).build()?;
    println!("{}", qr.to_str(1));

    let (ecl, mask) = read_format(qr.matrix()).into_result()?;
    println!("Format info: {:#06x} (level {ecl:?}, mask {mask})", qr.format_info());
    if let Some(version) = read_version(qr.matrix()) {
        println!("Version info: version {}", version.into_result()?);
    }
    for eval in qr.mask_evaluations() {
        println!("Mask {}: {:?}", eval.pattern, eval.score);
    }

    let decoded = decode(qr.matrix())?;
    println!("Decoded: {:?} ({} segments)", decoded.text(), decoded.segments.len());

    Ok(())
}
