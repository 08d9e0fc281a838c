use super::*;
use std::error::Error as _;

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// One-page PDF showing `text` in Helvetica, with a correct xref table.
fn one_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 18 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n", objects.len() + 1).as_bytes(),
    );
    pdf
}

// =============================================================================
// classification
// =============================================================================

#[test]
fn pdf_suffix_is_case_insensitive() {
    assert!(is_pdf(Path::new("/tmp/planta.pdf")));
    assert!(is_pdf(Path::new("/tmp/PLANTA.PDF")));
    assert!(is_pdf(Path::new("memorial.Pdf")));
    assert!(!is_pdf(Path::new("/tmp/planta.pdf.png")));
    assert!(!is_pdf(Path::new("/tmp/pdf")));
    assert!(!is_pdf(Path::new("/tmp/relatorio.xlsx")));
}

#[test]
fn display_name_is_base_name_only() {
    assert_eq!(display_name(Path::new("/srv/uploads/123-456.pdf")), "123-456.pdf");
}

// =============================================================================
// extract_text
// =============================================================================

#[tokio::test]
async fn non_pdf_yields_reference_marker_without_reading() {
    let text = extract_text(Path::new("/definitely/missing/foto.jpg")).await.unwrap();
    assert_eq!(text, reference_marker("foto.jpg"));
    assert!(text.contains("foto.jpg"));
}

#[tokio::test]
async fn missing_pdf_is_unreadable_with_base_name_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sumiu.pdf");
    let err = extract_text(&path).await.unwrap_err();
    let DocumentError::Unreadable { file_name, .. } = &err;
    assert_eq!(file_name, "sumiu.pdf");

    let msg = err.to_string();
    assert!(msg.contains("sumiu.pdf"));
    assert!(!msg.contains(&dir.path().display().to_string()));
    assert!(err.source().is_some());
}

#[tokio::test]
async fn valid_pdf_text_is_extracted_and_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "planta.pdf", &one_page_pdf("Planta BR101 km10"));
    let text = extract_text(&path).await.unwrap();
    assert_eq!(text, "Planta BR101 km10");
}

#[tokio::test]
async fn corrupt_pdf_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "quebrado.PDF", b"this is not a pdf at all");
    let err = extract_text(&path).await.unwrap_err();
    assert!(err.to_string().contains("quebrado.PDF"));
}

// =============================================================================
// extract_batch
// =============================================================================

#[tokio::test]
async fn batch_preserves_order_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(dir.path(), "art.docx", b"docx bytes");
    let second = write(dir.path(), "planta.pdf", b"%PDF-garbage");
    let third = write(dir.path(), "foto.png", b"png bytes");

    let out = extract_batch(&[first, second, third]).await;
    assert_eq!(out.len(), 3);
    assert_eq!(out[0], reference_marker("art.docx"));
    assert_eq!(out[1], error_marker("planta.pdf"));
    assert_eq!(out[2], reference_marker("foto.png"));
}

#[tokio::test]
async fn batch_keeps_extracted_text_in_its_slot_around_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(dir.path(), "planta.pdf", &one_page_pdf("Planta BR101 km10"));
    let missing = PathBuf::from("/definitely/missing/x.pdf");
    let third = write(dir.path(), "memorial.PDF", &one_page_pdf("Memorial descritivo"));

    let out = extract_batch(&[first, missing, third]).await;
    assert_eq!(
        out,
        vec![
            "Planta BR101 km10".to_string(),
            error_marker("x.pdf"),
            "Memorial descritivo".to_string(),
        ]
    );
}

#[tokio::test]
async fn batch_of_nothing_is_empty() {
    assert!(extract_batch(&[]).await.is_empty());
}

#[tokio::test]
async fn batch_with_every_file_failing_still_returns_all_slots() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = ["a.pdf", "b.pdf"]
        .iter()
        .map(|n| dir.path().join(n))
        .collect();
    let out = extract_batch(&paths).await;
    assert_eq!(out, vec![error_marker("a.pdf"), error_marker("b.pdf")]);
}
