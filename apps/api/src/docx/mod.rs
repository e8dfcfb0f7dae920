//! Marker text → `.docx`. The rewriter emits one logical element per line,
//! prefixed with a marker such as `[NAME]` or `[BULLET]`; this module lays
//! those lines out as a compact two-page résumé.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

mod package;

/// Below this many bullets the document will not fill two pages.
const MIN_BULLETS: usize = 15;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("document has no content")]
    Empty,

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

lazy_static! {
    static ref MARKER: Regex = Regex::new(r"^\[([A-Za-z_]+)\]\s*(.*)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Font size in points; `None` inherits the 10pt default.
    pub size_pt: Option<u32>,
}

impl Run {
    fn plain(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub align: Option<Align>,
    pub space_before_pt: u32,
    pub space_after_pt: u32,
    pub bottom_rule: bool,
    /// Right-aligned tab stop at 6.5" for dates.
    pub right_tab: bool,
    pub bullet: bool,
}

impl Paragraph {
    fn styled(run: Run, space_after_pt: u32) -> Self {
        Paragraph {
            runs: vec![run],
            space_after_pt,
            ..Default::default()
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Name,
    Contact,
    Summary,
    SectionHeader,
    JobTitle,
    Company,
    Dates,
    Location,
    Bullet,
    SkillCategory,
    Skills,
    EducationDegree,
    EducationSchool,
    EducationDates,
    EducationDetails,
}

impl Marker {
    fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "NAME" => Marker::Name,
            "CONTACT" => Marker::Contact,
            "SUMMARY" => Marker::Summary,
            "SECTION_HEADER" => Marker::SectionHeader,
            "JOB_TITLE" => Marker::JobTitle,
            "COMPANY" => Marker::Company,
            "DATES" => Marker::Dates,
            "LOCATION" => Marker::Location,
            "BULLET" => Marker::Bullet,
            "SKILL_CATEGORY" => Marker::SkillCategory,
            "SKILLS" => Marker::Skills,
            "EDUCATION_DEGREE" => Marker::EducationDegree,
            "EDUCATION_SCHOOL" => Marker::EducationSchool,
            "EDUCATION_DATES" => Marker::EducationDates,
            "EDUCATION_DETAILS" => Marker::EducationDetails,
            _ => return None,
        })
    }
}

/// Converts marker text into the bytes of a `.docx` file.
pub fn text_to_docx(resume_text: &str) -> Result<Vec<u8>, DocxError> {
    let paragraphs = layout(resume_text);
    if paragraphs.is_empty() {
        return Err(DocxError::Empty);
    }

    let bullets = paragraphs.iter().filter(|p| p.bullet).count();
    info!("Resume contains {bullets} bullet points");
    if bullets < MIN_BULLETS {
        warn!("Resume may not have enough bullet points ({bullets}) to fill two pages");
    }

    let bytes = package::write_package(&paragraphs)?;
    info!("Generated DOCX ({} paragraphs, {} bytes)", paragraphs.len(), bytes.len());
    Ok(bytes)
}

/// Turns marker lines into formatted paragraphs. Job and education headings
/// are built up across consecutive lines (title, company, dates).
pub fn layout(resume_text: &str) -> Vec<Paragraph> {
    let mut doc: Vec<Paragraph> = Vec::new();
    let mut last_job: Option<usize> = None;
    let mut last_edu: Option<usize> = None;

    for line in resume_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parsed = MARKER
            .captures(line)
            .and_then(|c| Marker::parse(&c[1]).map(|m| (m, c[2].trim().to_string())));

        let Some((marker, text)) = parsed else {
            doc.push(Paragraph::styled(Run::plain(line), 3));
            last_job = None;
            last_edu = None;
            continue;
        };
        if text.is_empty() {
            continue;
        }

        match marker {
            Marker::Name => doc.push(Paragraph {
                align: Some(Align::Center),
                ..Paragraph::styled(
                    Run {
                        text,
                        bold: true,
                        size_pt: Some(16),
                        ..Default::default()
                    },
                    2,
                )
            }),
            Marker::Contact => doc.push(Paragraph {
                align: Some(Align::Center),
                bottom_rule: true,
                ..Paragraph::styled(
                    Run {
                        text,
                        size_pt: Some(9),
                        ..Default::default()
                    },
                    6,
                )
            }),
            Marker::Summary => {
                let bold = text.contains("US Citizen");
                doc.push(Paragraph::styled(
                    Run {
                        text,
                        bold,
                        ..Default::default()
                    },
                    2,
                ));
            }
            Marker::SectionHeader => doc.push(Paragraph {
                space_before_pt: 6,
                bottom_rule: true,
                ..Paragraph::styled(
                    Run {
                        text: text.to_uppercase(),
                        bold: true,
                        size_pt: Some(11),
                        ..Default::default()
                    },
                    3,
                )
            }),
            Marker::JobTitle => {
                doc.push(Paragraph::styled(bold(text), 0));
                last_job = Some(doc.len() - 1);
            }
            Marker::Company => match last_job.filter(|&i| !doc[i].text().trim().is_empty()) {
                Some(i) => doc[i].runs.push(italic(format!(" | {text}"))),
                None => {
                    doc.push(Paragraph::styled(italic(text), 0));
                    last_job = Some(doc.len() - 1);
                }
            },
            Marker::Dates => match last_job.take() {
                Some(i) => append_right_tabbed(&mut doc[i], text),
                None => doc.push(right_aligned(text)),
            },
            Marker::Location => doc.push(Paragraph::styled(
                Run {
                    text,
                    italic: true,
                    size_pt: Some(9),
                    ..Default::default()
                },
                2,
            )),
            Marker::Bullet => doc.push(bullet(&text)),
            Marker::SkillCategory => doc.push(Paragraph {
                space_before_pt: 3,
                ..Paragraph::styled(bold(format!("{text}: ")), 0)
            }),
            Marker::Skills => match doc.last_mut().filter(|p| p.text().ends_with(": ")) {
                Some(category) => {
                    category.runs.push(Run::plain(text));
                    category.space_after_pt = 3;
                }
                None => doc.push(Paragraph::styled(Run::plain(text), 3)),
            },
            Marker::EducationDegree => {
                doc.push(Paragraph::styled(bold(text), 0));
                last_edu = Some(doc.len() - 1);
            }
            Marker::EducationSchool => match last_edu.filter(|&i| !doc[i].text().trim().is_empty()) {
                Some(i) => doc[i].runs.push(italic(format!(", {text}"))),
                None => {
                    doc.push(Paragraph::styled(italic(text), 0));
                    last_edu = Some(doc.len() - 1);
                }
            },
            Marker::EducationDates => match last_edu.take() {
                Some(i) => append_right_tabbed(&mut doc[i], text),
                None => doc.push(right_aligned(text)),
            },
            Marker::EducationDetails => doc.push(Paragraph::styled(
                Run {
                    text,
                    italic: true,
                    size_pt: Some(9),
                    ..Default::default()
                },
                3,
            )),
        }
    }

    doc
}

fn bold(text: String) -> Run {
    Run {
        text,
        bold: true,
        ..Default::default()
    }
}

fn italic(text: String) -> Run {
    Run {
        text,
        italic: true,
        ..Default::default()
    }
}

fn right_aligned(text: String) -> Paragraph {
    Paragraph {
        align: Some(Align::Right),
        ..Paragraph::styled(Run::plain(text), 2)
    }
}

fn append_right_tabbed(paragraph: &mut Paragraph, text: String) {
    paragraph.right_tab = true;
    paragraph.runs.push(Run::plain(format!("\t{text}")));
    paragraph.space_after_pt = 2;
}

/// The lead sentence of a bullet is bold; the rest stays regular weight.
fn bullet(text: &str) -> Paragraph {
    let sentences: Vec<&str> = text.split(". ").filter(|s| !s.trim().is_empty()).collect();
    let last = sentences.len().saturating_sub(1);

    let runs = sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let ends_with_punct = sentence.ends_with(['.', '!', '?']);
            let text = if i < last || !ends_with_punct {
                format!("{sentence}. ")
            } else {
                format!("{sentence} ")
            };
            Run {
                text,
                bold: i == 0,
                ..Default::default()
            }
        })
        .collect();

    Paragraph {
        runs,
        space_after_pt: 2,
        bullet: true,
        ..Default::default()
    }
}
