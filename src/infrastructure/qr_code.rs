use crate::domain::ports::{CodeGenerator, GeneratedCode};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use qrcode::QrCode;
use qrcode::render::svg;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const HANDLE_PREFIX: &str = "qr_code_payment_";

/// Simulated bank integration that writes QR codes to disk.
///
/// Every generated reference is a fresh UUID v4. The QR code encodes the
/// copy-and-paste payload `hash_payment_<reference>` and is written as
/// `<dir>/qr_code_payment_<reference>.svg`; the handle is the file stem.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    dir: PathBuf,
}

impl QrCodeGenerator {
    /// Creates the generator, making sure `dir` exists.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// Maps a handle back to its file. Anything that is not exactly a handle
    /// we could have issued is treated as unknown.
    fn path_for(&self, code_handle: &str) -> Option<PathBuf> {
        let reference = code_handle.strip_prefix(HANDLE_PREFIX)?;
        let uuid = Uuid::parse_str(reference).ok()?;
        if uuid.hyphenated().to_string() != reference {
            return None;
        }
        Some(self.dir.join(format!("{code_handle}.svg")))
    }
}

/// Renders the copy-and-paste payload of `bank_reference` as an SVG QR code.
pub fn render_svg(bank_reference: &str) -> Result<String> {
    let payload = format!("hash_payment_{bank_reference}");
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| PaymentError::CodeGeneration(format!("QR encoding failed: {}", e)))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build())
}

#[async_trait]
impl CodeGenerator for QrCodeGenerator {
    async fn generate(&self) -> Result<GeneratedCode> {
        let bank_reference = Uuid::new_v4().to_string();
        let code_handle = format!("{HANDLE_PREFIX}{bank_reference}");
        let image = render_svg(&bank_reference)?;

        let path = self.dir.join(format!("{code_handle}.svg"));
        tokio::fs::write(&path, image).await.map_err(|e| {
            PaymentError::CodeGeneration(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(GeneratedCode {
            bank_reference,
            code_handle,
        })
    }

    async fn load(&self, code_handle: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.path_for(code_handle) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(&self, code_handle: &str) -> Result<()> {
        let Some(path) = self.path_for(code_handle) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
