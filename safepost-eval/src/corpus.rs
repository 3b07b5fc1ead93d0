use std::fs;
use std::path::{Path, PathBuf};

use safepost_types::PiiCategory;

use crate::{EvalCase, EvalError, Expected};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Debug, Default)]
pub struct Corpus {
    pub cases: Vec<EvalCase>,
    /// Category folders found, including empty ones.
    pub folders: usize,
    /// Subfolders whose name maps to no category.
    pub skipped: Vec<String>,
}

/// Category for a corpus folder name. Surrounding whitespace is ignored.
pub fn category_for_folder(name: &str) -> Option<PiiCategory> {
    match name.trim() {
        "Address" => Some(PiiCategory::Address),
        "Email" => Some(PiiCategory::Emails),
        "License Plate" => Some(PiiCategory::LicensePlates),
        "Phone Numbers" => Some(PiiCategory::PhoneNumbers),
        _ => None,
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Collects every image one level below each category folder of `root`.
/// Cases are ordered by folder, then file name.
pub fn discover(root: &Path) -> Result<Corpus, EvalError> {
    if !root.is_dir() {
        return Err(EvalError::MissingRoot(root.to_path_buf()));
    }

    let mut subfolders: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    subfolders.sort();

    let mut corpus = Corpus::default();
    for folder in subfolders {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(category) = category_for_folder(&name) else {
            tracing::warn!(folder = %name, "unknown corpus folder, skipping");
            corpus.skipped.push(name);
            continue;
        };
        corpus.folders += 1;

        let mut images: Vec<PathBuf> = fs::read_dir(&folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        images.sort();

        corpus.cases.extend(images.into_iter().map(|image| EvalCase {
            image,
            folder: name.clone(),
            expected: Expected { category },
        }));
    }
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_names_map_to_categories() {
        assert_eq!(category_for_folder("Email "), Some(PiiCategory::Emails));
        assert_eq!(category_for_folder("Email"), Some(PiiCategory::Emails));
        assert_eq!(category_for_folder("License Plate"), Some(PiiCategory::LicensePlates));
        assert_eq!(category_for_folder("Selfies"), None);
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_type(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type(Path::new("a.bmp")), "image/jpeg");
        assert_eq!(mime_type(Path::new("a.jpeg")), "image/jpeg");
    }

    #[test]
    fn discovers_images_in_known_folders() {
        let root = tempfile::tempdir().unwrap();
        let email = root.path().join("Email ");
        let plates = root.path().join("License Plate");
        let other = root.path().join("Misc");
        for dir in [&email, &plates, &other] {
            fs::create_dir(dir).unwrap();
        }
        fs::write(email.join("b.png"), b"x").unwrap();
        fs::write(email.join("a.JPG"), b"x").unwrap();
        fs::write(email.join("notes.txt"), b"x").unwrap();
        fs::write(plates.join("car.webp"), b"x").unwrap();
        fs::write(other.join("skip.png"), b"x").unwrap();

        let corpus = discover(root.path()).unwrap();
        assert_eq!(corpus.folders, 2);
        assert_eq!(corpus.skipped, vec!["Misc".to_string()]);
        let names: Vec<_> = corpus
            .cases
            .iter()
            .map(|c| c.image.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "car.webp"]);
        assert_eq!(corpus.cases[0].expected.category, PiiCategory::Emails);
        assert_eq!(corpus.cases[2].expected.category, PiiCategory::LicensePlates);
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = discover(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, EvalError::MissingRoot(_)));
    }
}
