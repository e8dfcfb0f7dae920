use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, NOT_SPECIFIED};

pub fn job_details_prompt(job_description: &str) -> String {
    format!(
        r#"Extract the following information from this job description:
1. Job Title (the specific position being advertised)
2. Company Name (the organization offering the job)
3. Role (the general role category, like "Engineering", "Marketing", "Finance")

If any of these cannot be clearly determined, use "{NOT_SPECIFIED}".

Job Description:
{job_description}

Respond with a JSON object in this exact format:
{{
    "job_title": "extracted job title",
    "company_name": "extracted company name",
    "role": "extracted role category"
}}

{JSON_ONLY_INSTRUCTION}"#
    )
}

/// Marker vocabulary understood by the DOCX layout.
const MARKER_GUIDE: &str = "\
- `[NAME] Your Name`
- `[CONTACT] 555-555-5555 | you@example.com | https://example.com | City, State`
- `[SUMMARY] Professional summary with key qualifications (6-8 detailed lines)`
- `[SECTION_HEADER] PROFESSIONAL EXPERIENCE`
- `[JOB_TITLE] Senior Cloud Engineer`
- `[COMPANY] ExampleCorp`
- `[DATES] Jan 2022 – Present`
- `[LOCATION] City, State`
- Plain paragraph text for a 2-3 sentence role overview
- `[BULLET] Detailed multi-sentence accomplishment`
- `[SECTION_HEADER] SKILLS`
- `[SKILL_CATEGORY] Configuration & Deployment`
- `[SKILLS] Comma, separated, skills`
- `[EDUCATION_DEGREE] Degree`, `[EDUCATION_SCHOOL] School`, `[EDUCATION_DATES] Year`, `[EDUCATION_DETAILS] Honors`";

pub fn rewrite_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"You are an expert resume writer rewriting a resume for a specific job. Focus on content alignment, professional formatting for a DOCX document, and filling exactly two pages.

## Critical requirements
- The rewritten resume MUST contain enough detail to fill TWO FULL PAGES (roughly 700-1000 words).
- Write 5-7 detailed bullet points for EVERY position, more for recent positions. Each bullet is 3-4 sentences.
- The professional summary is 6-8 lines.
- Keep ALL positions, skills and experiences from the original resume. Do not invent employers or degrees.
- Keep the original header details (citizenship, clearance, contact information) when present.

## Content expansion
For every original bullet, elaborate on the problem, the approach, the technologies used, the people involved and the measurable impact. Begin every position with a 2-3 sentence overview paragraph. Organize skills into the categories used in the original resume and add job-description skills only where the original resume shows genuine experience.

## Job Description
{job_description}

## Original Resume
{resume_text}

## Formatting markers
Put each element on its own line, prefixed with one of these markers:
{MARKER_GUIDE}

## Output format
Respond with a JSON object using this exact structure:
{{
    "rewritten_resume_text": "[NAME] Your Name\n[CONTACT] ...\n[SUMMARY] ...\n[SECTION_HEADER] PROFESSIONAL EXPERIENCE\n[JOB_TITLE] ...\n[COMPANY] ...\n[DATES] ...\n[BULLET] ...",
    "changes_summary": ["what changed and why"],
    "integration_percentage": "90%",
    "highlighted_skills": ["skill emphasized for this job"],
    "gap_analysis": ["job requirement the resume still does not address"]
}}

{JSON_ONLY_INSTRUCTION}"#
    )
}
