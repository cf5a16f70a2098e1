//! System prompts and outbound message construction.

use super::types::ChatMessage;
use crate::project::FileStore;

pub const CREATION_SYSTEM_PROMPT: &str = r#"You are an expert web developer AI assistant. Your task is to generate the complete code for a user's request.
First, you must provide the full code for all necessary files (e.g., index.html, style.css, script.js, etc.).
Present the code as separate markdown code blocks, with the FULL FILENAME (including extension) as the language specifier.
After providing the code, you MUST provide a task summary in the specified format.
Do not add any explanations, introductions, or conclusions outside of the code blocks and summary.
The user will only see the final rendered website, so your response must be only the code.

IMPORTANT: Always use the complete filename with extension in the code fence, for example:
```index.html
NOT ```html

Example response format:

```index.html
<!DOCTYPE html>
<html>
<head>
    <link rel="stylesheet" href="style.css">
</head>
<body>
    <h1>Hello!</h1>
    <script src="script.js"></script>
</body>
</html>
```

```style.css
body {
    font-family: sans-serif;
}
```

```script.js
console.log("Hello from script!");
```

<task_summary>
A short, high-level summary of what was created or changed.
</task_summary>
"#;

pub const MODIFICATION_SYSTEM_PROMPT: &str = r#"You are an expert web developer AI assistant. Your task is to modify an existing website based on a user's request.
The user will provide you with the current code for all project files, followed by their instructions for changes.
You must analyze the existing code and the user's request, then generate the updated code for any files that need to be changed. You can also create new files or delete existing ones.

IMPORTANT: Always use the complete filename with extension in the code fence, for example:
```style.css
NOT ```css

- **To update a file:** Provide the *complete, updated code* for the file in a markdown code block with the FULL FILENAME.
- **To create a new file:** Provide the code for the new file in a markdown code block with the FULL new filename (including extension).
- **To delete a file:** Provide a code block with the full filename and the keyword "DELETE_FILE" inside. For example: ```obsolete.js
DELETE_FILE
```
- **To rename a file:** This is a two-step process. First, create the new file with the content. Second, delete the old file.
- If a file does not need to be changed, do not include it in your response.

After providing the code, you MUST provide a task summary in the specified format.
Do not add any explanations, introductions, or conclusions outside of the code blocks and summary.

Example of changing CSS and deleting a script:

```style.css
body {
    font-family: sans-serif;
    background-color: #f0f0f0; /* New background color */
}
```

```old-script.js
DELETE_FILE
```

<task_summary>
Updated the background color and removed an old script file.
</task_summary>
"#;

const PROJECT_PREAMBLE: &str = "Here is the current code for the project:\n\n";
const CHANGE_PREFIX: &str = "Now, please apply the following change: ";

/// Which instruction set a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Creation,
    Modification,
}

impl PromptMode {
    /// Creation while every file is blank (including an empty store).
    pub fn for_store(store: &FileStore) -> Self {
        if store.all_blank() {
            PromptMode::Creation
        } else {
            PromptMode::Modification
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            PromptMode::Creation => CREATION_SYSTEM_PROMPT,
            PromptMode::Modification => MODIFICATION_SYSTEM_PROMPT,
        }
    }
}

/// Serialize every file as `**path**` followed by a fenced copy of its content.
pub fn serialize_project(store: &FileStore) -> String {
    let mut out = String::from(PROJECT_PREAMBLE);
    for file in store.list() {
        let lang = file.path.rsplit('.').next().unwrap_or("");
        out.push_str(&format!(
            "**{}**\n```{}\n{}\n```\n\n",
            file.path, lang, file.content
        ));
    }
    out
}

/// System and user messages for `prompt` against the current store.
pub fn build_messages(store: &FileStore, prompt: &str) -> Vec<ChatMessage> {
    let mode = PromptMode::for_store(store);
    let user = match mode {
        PromptMode::Creation => prompt.to_string(),
        PromptMode::Modification => {
            format!("{}{}{}", serialize_project(store), CHANGE_PREFIX, prompt)
        }
    };
    vec![
        ChatMessage::system(mode.system_prompt()),
        ChatMessage::user(user),
    ]
}
