mod common;

use std::{error::Error, fs, net::TcpListener};

use common::{phytoguard, serve_once, stdout_of};
use tempfile::tempdir;

#[test]
fn unreachable_backend_is_reported_as_connection_failure() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image = work_dir.path().join("leaf.jpg");
    fs::write(&image, [0xFF, 0xD8, 0xFF, 0xD9])?;
    let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();

    let output = phytoguard(work_dir.path())
        .arg("predict")
        .arg(&image)
        .arg("--url")
        .arg(format!("http://127.0.0.1:{port}/predict"))
        .args(["--timeout", "5"])
        .output()?;
    assert!(!output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Error al conectar con el backend"), "{stdout}");
    assert!(stdout.contains("[unreachable]"), "{stdout}");
    Ok(())
}

#[test]
fn empty_detection_list_is_a_success() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image = work_dir.path().join("leaf.jpg");
    fs::write(&image, [0xFF, 0xD8, 0xFF, 0xD9])?;
    let (url, server) = serve_once("200 OK", r#"{"success": true, "detections": []}"#);

    let output = phytoguard(work_dir.path())
        .arg("predict")
        .arg(&image)
        .arg("--url")
        .arg(&url)
        .output()?;
    server.join().expect("mock backend thread");
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout_of(&output);
    assert!(stdout.contains("Status code: 200"), "{stdout}");
    assert!(stdout.contains("Comunicación exitosa"), "{stdout}");
    assert!(stdout.contains("Sin detecciones."), "{stdout}");
    assert!(!work_dir.path().join("images/predict").exists());
    Ok(())
}

#[test]
fn backend_error_status_is_not_a_decode_failure() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image = work_dir.path().join("leaf.jpg");
    fs::write(&image, [0xFF, 0xD8, 0xFF, 0xD9])?;
    let (url, server) = serve_once("500 Internal Server Error", "Internal Server Error");

    let output = phytoguard(work_dir.path())
        .arg("predict")
        .arg(&image)
        .arg("--url")
        .arg(&url)
        .output()?;
    server.join().expect("mock backend thread");
    assert!(!output.status.success());

    let stdout = stdout_of(&output);
    assert!(stdout.contains("error HTTP (500)"), "{stdout}");
    assert!(stdout.contains("content-type: application/json"), "{stdout}");
    assert!(stdout.contains("[http-error]"), "{stdout}");
    assert!(!stdout.contains("interpretar"), "{stdout}");
    Ok(())
}
