// Intake LLM prompt templates.

pub const RESUME_ANALYSIS_PROMPT: &str = r#"You are an AI recruiter. Extract data from this resume.

CRITICAL INSTRUCTION: Return ONLY valid JSON.
Do not use Markdown formatting (no ```json or ```).
Do not include any intro text. Start with { and end with }.

OUTPUT SCHEMA (return exactly this structure):
{
  "skills": ["Skill1", "Skill2"],
  "gpa": "8.5",
  "degree": "B.Tech"
}

RULES:
1. "skills" is a list of strings, one skill per entry.
2. "gpa" is a string exactly as written in the resume; use "" if absent.
3. "degree" is a string naming the highest degree; use "" if absent.

RESUME TEXT:
{resume_text}"#;
