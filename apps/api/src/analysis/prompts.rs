use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

pub fn analysis_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"I need a highly critical and analytical evaluation of my resume for a specific job application. Be thorough and do not hold back on criticism. Focus on gaps, misalignments, and areas for improvement.

Here is my resume:
{resume_text}

Here is the job description I'm applying for:
{job_description}

Provide the following with deep analysis and specificity:

1. Skills from my resume that align with this job. For each, rate how strongly it is demonstrated (1-5) and how critical it is for the role (1-5).
2. Skills from the job description that are missing or insufficiently demonstrated, how important each is, and how to address the gap.
3. Specific improvements to formatting, structure and content for this role.
4. Red flags, gaps or inconsistencies a hiring manager for this role would notice.
5. Guidance on how to reframe my experience for this role, with concrete rewording examples.
6. A gap analysis with percentage match estimates.

Format the response as JSON with this structure:
{{
    "matching_skills": [
        {{"skill": "skill1", "strength": 4, "importance": 5, "notes": "how this is demonstrated"}}
    ],
    "missing_skills": [
        {{"skill": "skill1", "importance": 5, "suggestion": "how to address this gap"}}
    ],
    "improvement_suggestions": ["suggestion with a specific example"],
    "potential_red_flags": ["red flag and why it matters for this role"],
    "experience_tailoring": ["how to reframe a specific experience"],
    "gap_analysis": {{"overall_match": "65%", "technical_match": "70%", "experience_match": "60%", "critical_gaps": ["gap1", "gap2"]}}
}}

{JSON_ONLY_INSTRUCTION}"#
    )
}
