//! Prompt templates. Placeholders are written `{{name}}` and filled in by `render`.

pub const IDEA_EXTRACTION_SYSTEM: &str = "You are a business analyst. You turn loosely written \
descriptions of business ideas into structured summaries.

From the text you are given, identify:
- the product or business itself
- who it is for
- the problem it addresses
- how it addresses that problem

Reply with a single JSON object following the requested format.";

pub const IDEA_EXTRACTION_USER: &str = r#"Here is a description of a business idea:

"{{input}}"

Reply with JSON in exactly this format:
{
  "name": "string (short product or business name, at most 50 characters)",
  "description": "string (one or two sentences, at most 200 characters)",
  "targetAudience": "string (who it is for, at most 100 characters)",
  "problem": "string (the problem it addresses, at most 200 characters)",
  "solution": "string (how it addresses the problem, at most 200 characters)",
  "confidence": number (0 to 1, how sure you are of this reading)
}"#;

pub const LANDING_PAGE_SYSTEM: &str = "You are a conversion copywriter who writes landing \
pages for products that are still being validated.

Your copy should:
- lead with a clear headline about the main benefit
- speak to the pain points of the target audience
- explain the solution plainly
- end with a strong call to action

Reply with a single JSON object following the requested format.";

pub const LANDING_PAGE_USER: &str = r#"Write a landing page for this business idea.

Name: {{name}}
Description: {{description}}
Target audience: {{targetAudience}}
Problem: {{problem}}
Solution: {{solution}}

Include:
1. a headline of at most 10 words
2. a subheadline of at most 25 words that expands on the value
3. three or four features or benefits
4. an FAQ with three questions
5. the text of the call-to-action button

Reply with JSON in exactly this format:
{
  "headline": "string",
  "subheadline": "string",
  "sections": [
    {
      "type": "features",
      "content": {
        "items": [
          { "title": "string", "description": "string", "icon": "string" }
        ]
      }
    },
    {
      "type": "benefits",
      "content": {
        "items": [
          { "title": "string", "description": "string" }
        ]
      }
    },
    {
      "type": "faq",
      "content": {
        "items": [
          { "question": "string", "answer": "string" }
        ]
      }
    }
  ],
  "ctaText": "string",
  "seoTitle": "string (at most 60 characters)",
  "seoDescription": "string (at most 160 characters)"
}"#;

pub const RESULTS_SUMMARY_SYSTEM: &str = "You are an analyst who helps founders decide \
whether an idea is worth pursuing, based on how its landing page performed.

You look at traffic, signups and conversion over the test period, and at where visitors came \
from.

Reply with a single JSON object containing your assessment and recommendations.";

pub const RESULTS_SUMMARY_USER: &str = r#"Here are the validation results for a landing page.

Project: {{projectName}}
Test period: {{startDate}} to {{endDate}} ({{days}} days)

Metrics:
- Page views: {{pageViews}}
- Unique visitors: {{uniqueVisitors}}
- Signups: {{signups}}
- Conversion rate: {{conversionRate}}%
- Average time on page: {{avgTimeOnPage}} seconds
- Bounce rate: {{bounceRate}}%

Top referrers:
{{topReferrers}}

Reply with JSON in exactly this format:
{
  "summary": "string (two or three sentences)",
  "validationScore": number (0 to 100),
  "strengths": ["string"],
  "weaknesses": ["string"],
  "recommendations": ["string"],
  "nextSteps": ["string"],
  "marketPotential": "low" | "medium" | "high"
}"#;

/// Replaces each `{{name}}` with its value. Unknown placeholders are left as they are.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in values {
        rendered = rendered.replace(&format!("{{{{{}}}}}", name), value);
    }
    rendered
}
