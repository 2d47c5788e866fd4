use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/actions.csv")
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "product,kind,quantity,unit_price,line_total",
        ))
        .stdout(predicate::str::contains("rice,standard,2,80,160"))
        .stdout(predicate::str::contains("husk,waste,3,12.5,37.5"))
        .stdout(predicate::str::contains("wheat").not())
        .stdout(predicate::str::contains("seed-drill").not())
        .stdout(predicate::str::contains("total,,5,,197.5"))
        .stderr(predicate::str::contains("Error reading action"))
        .stderr(predicate::str::contains(
            "Error processing action: Product tomato is no longer available",
        ))
        .stderr(predicate::str::contains(
            "Payment of ₹12000.00 received. Your order has been placed!",
        ));

    Ok(())
}

#[test]
fn test_cli_checkout_empties_cart_after_login() -> Result<(), Box<dyn std::error::Error>> {
    let mut csv = tempfile::NamedTempFile::new()?;
    writeln!(csv, "action, product, kind, quantity, detail")?;
    writeln!(csv, "add, rice, standard, 2,")?;
    writeln!(csv, "login, , , , asha@example.com")?;
    writeln!(csv, "checkout, , , , upi:asha@okbank")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(csv.path())
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("1 item(s) moved to your account"))
        .stderr(predicate::str::contains("Payment of ₹160.00 received."))
        .stdout(predicate::str::contains("total,,0,,0"));

    Ok(())
}

#[test]
fn test_cli_invalid_upi_id_keeps_cart() -> Result<(), Box<dyn std::error::Error>> {
    let mut csv = tempfile::NamedTempFile::new()?;
    writeln!(csv, "action, product, kind, quantity, detail")?;
    writeln!(csv, "add, wheat, standard, 3,")?;
    writeln!(csv, "checkout, , , , upi:not-an-upi-id")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(csv.path())
        .arg("--catalog")
        .arg("tests/fixtures/catalog.json");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "Error processing action: Please enter a valid UPI ID (e.g. name@bank)",
        ))
        .stdout(predicate::str::contains("wheat,standard,3,40,120"));

    Ok(())
}
