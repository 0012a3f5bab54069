//! Prompt templates for the base explanation and the explainers' follow-up calls.

fn analysis_block(base_explanation: &str) -> String {
    format!(
        "--- Detailed Analysis Start ---\n{base_explanation}\n--- Detailed Analysis End ---"
    )
}

fn analysis_and_source_block(base_explanation: &str, source: &str) -> String {
    format!(
        "{}\n\n--- Original Source Code Start ---\n{source}\n--- Original Source Code End ---",
        analysis_block(base_explanation)
    )
}

/// The fixed template for the first call; `source` is the whole bundle text
pub fn create_base_prompt(source: &str) -> String {
    format!(
        "Please analyze the following source code (which may consist of multiple concatenated files) in detail. \
Provide a comprehensive explanation covering:
1. The overall purpose and main functionality of the combined code.
2. Key components (functions, classes, modules) across the different files if applicable, and their individual roles.
3. How the components interact or the general execution flow of the entire codebase.
4. Any notable inputs the code expects or outputs it produces.

--- Source Code Start ---
{source}
--- Source Code End ---

Detailed Explanation:"
    )
}

pub fn key_components_prompt(base_explanation: &str) -> String {
    format!(
        "Based *only* on the following detailed code analysis:

{}

Please identify and list the key components (such as main functions, classes, modules, or significant structures) described in the analysis.
For each component, provide a very brief (one-sentence) description of its purpose as mentioned in the analysis.
Present this as a bulleted list.

Example:
* `process_data()`: This function is responsible for processing the input data.
* `UserClass`: This class represents a user in the system.

Key Components:",
        analysis_block(base_explanation)
    )
}

pub fn metaphor_prompt(base_explanation: &str) -> String {
    format!(
        "Based *only* on the following detailed code analysis:

{}

Please generate a creative and insightful metaphor or real-world analogy to explain the overall structure and functionality of the code described in the analysis.
Describe the analogy and briefly map the key components or processes mentioned in the analysis to elements within your analogy.

Example: \"Think of this code as a custom coffee shop. Requests are orders placed by customers. The main router function is the barista who directs the order. \
Specific functions are like different coffee machines (espresso, drip) that prepare the drink. The database is the cash register and order history log.\"

Metaphor/Analogy Explanation:",
        analysis_block(base_explanation)
    )
}

pub fn edge_cases_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code provided below, \
please identify potential **edge cases** that would be important to cover when writing automated tests (unit tests, integration tests, etc.).

Focus specifically on scenarios that might not be immediately obvious or represent boundary conditions, such as:
* Empty inputs (e.g., empty strings, zero values, empty lists/arrays)
* Null or undefined inputs
* Very large or maximum allowed inputs
* Inputs with special characters or unusual formatting
* Zero iterations in loops
* Off-by-one errors in indexing or conditions
* Specific sequences of operations that might lead to unexpected states
* Resource exhaustion scenarios (if applicable/discernible)
* Concurrency issues leading to race conditions or deadlocks (if applicable)
* Failure conditions (e.g., network errors, file not found) and how the code should react

For each edge case identified, briefly explain *why* it's relevant for testing. \
If no significant edge cases are apparent from the provided information, state that clearly.

{}

Edge Cases for Automated Testing:",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn flowchart_text_prompt(base_explanation: &str) -> String {
    format!(
        "Based *only* on the following detailed code analysis, focusing on the 'Execution Flow' and 'Component Interaction' sections if available:

{}

Describe the typical execution flow of the code step-by-step using simple text notation suitable for building a flowchart. Use terms like:
* `Start` / `End`
* `Process: [Action]` (e.g., `Process: Read configuration file`)
* `Input: [Data]` (e.g., `Input: User credentials`)
* `Output: [Result]` (e.g., `Output: Display results`)
* `Decision: [Condition]?` (e.g., `Decision: Is user valid?`)
* `Loop: [Condition/Items]` / `End Loop`
* `Call: [Function/Method]`
* `Parallel: [Tasks]` / `End Parallel` (if applicable)
* `Sub-process: [Name]` (for complex sections)

Connect steps logically using `->` (arrow). Keep descriptions brief and focused on the flow derived from the analysis.

Example:
Start -> Input: File path -> Process: Read file content -> Loop: Each line -> Decision: Is line valid? -> (Yes) Process: Extract data -> (No) Process: Log error -> End Loop -> Output: Summary report -> End

Provide *only* the text-based flowchart description. Do not include explanations about the format itself. If the flow isn't clear from the analysis, state that.",
        analysis_block(base_explanation)
    )
}

pub fn code_rap_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, \
generate a **rap song** that explains what the code does, its main purpose, and key functionalities.

The rap should be:
- Informative yet entertaining.
- Have a good rhythm and flow (though actual audio isn't generated).
- Mention some key components or actions the code performs.
- Be suitable for a developer audience.

{}

Produce ONLY the rap lyrics. Do not include any other explanatory text, titles like \"Rap Lyrics:\", or markdown formatting.

Rap Lyrics:",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn gap_analysis_prompt(
    requirements_label: &str,
    requirements: &str,
    base_explanation: &str,
    source: &str,
) -> String {
    format!(
        "You are an expert software quality assurance analyst. Your task is to perform a functional gap analysis.
Compare the provided source code and its general explanation against the functional requirements listed below.

**Objective:**
Identify discrepancies between the functional requirements and the provided code. Specifically, report on:
1.  **Missing Requirements:** Requirements listed that do not appear to be implemented or addressed in the code.
2.  **Incorrect or Incomplete Implementations:** Requirements that seem to be addressed by the code, but where the implementation \
appears to be flawed, incomplete, or deviates from the requirement. For these, try to cite specific parts of the original source code \
(e.g., function names, class names, or even short snippets if possible and relevant) that relate to the issue.

**Output Format:**
Produce a structured report. Use Markdown for clarity.
For each identified gap, clearly state the requirement in question.

--- Functional Requirements (from file: {requirements_label}) ---
{requirements}
--- End of Functional Requirements ---

--- General Code Explanation (from base LLM analysis) ---
{base_explanation}
--- End of General Code Explanation ---

--- Original Source Code ---
{source}
--- End of Original Source Code ---

**Gap Analysis Report:**

**1. Missing Requirements:**
   (List each missing requirement and briefly explain why it appears to be missing based on the code and its explanation. \
If none, state \"No missing requirements identified.\")

**2. Incorrect or Incomplete Implementations:**
   (For each, state the requirement, describe the discrepancy, and cite the relevant code section(s) as specifically as possible. \
If none, state \"No incorrect or incomplete implementations identified based on the provided information.\")

Please be thorough and analytical."
    )
}

pub fn call_graph_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, \
generate a **Call Graph** description in the **DOT language** suitable for rendering with Graphviz.

Identify key functions, methods, or procedures and the calls made between them.
* Nodes should represent the functions/methods. Use meaningful and concise labels (e.g., function name, or Class.methodName).
* Directed edges (`Caller -> Callee;`) should indicate that the \"Caller\" function/method makes a call to the \"Callee\" function/method.
* Focus on the primary call relationships to keep the graph readable. Avoid overly granular or standard library calls unless they are central to the logic.
* If possible, indicate the entry point(s) or main function(s) by giving them a distinct style (e.g., `shape=doublecircle` or `fillcolor=lightgreen`).

{}

Provide *ONLY* the DOT language code block itself, starting directly with `digraph CallGraph {{` and ending with `}}`. \
Do not include any other explanatory text, markdown formatting like backticks, or the word 'dot' outside the code block.

**Example DOT Output for a Call Graph:**
digraph CallGraph {{
  rankdir=LR;
  node [shape=box, style=\"rounded,filled\", fillcolor=lightblue];

  \"main\" [label=\"main()\", shape=doublecircle, fillcolor=palegreen];
  \"processInput\" [label=\"processInput(data)\"];
  \"validateData\" [label=\"validateData(input)\"];
  \"calculateResult\" [label=\"calculateResult(validData)\"];
  \"saveOutput\" [label=\"saveOutput(result)\"];

  \"main\" -> \"processInput\";
  \"processInput\" -> \"validateData\";
  \"processInput\" -> \"calculateResult\";
  \"main\" -> \"saveOutput\";
}}

DOT Language Output:",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn dependency_graph_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, \
generate a dependency graph description in the **DOT language** suitable for rendering with Graphviz.

Identify key components (e.g., modules, files, classes, major functions/methods) and the dependencies between them (e.g., imports, calls, usage).
* Nodes should represent the components. Use meaningful and concise labels.
* Directed edges (`A -> B`) should indicate that component A depends on component B (or A uses/calls B).
* Keep the graph focused on significant dependencies to maintain readability.

{}

Provide *only* the DOT language code block itself, starting directly with `digraph Dependencies {{` (or a similar graph name) and ending with `}}`. \
Do not include any other explanatory text, markdown formatting like backticks, or the word 'dot' outside the code block.

Example DOT Output for a Dependency Graph:
digraph Dependencies {{
  rankdir=LR;
  node [shape=box, style=\"rounded,filled\", fillcolor=lightblue];

  \"MainApp\" [label=\"Main Application\"];
  \"ModuleA\" [label=\"Data Processing Module\"];
  \"ModuleB\" [label=\"Utility Functions\"];
  \"DatabaseConnector\" [label=\"DB Connector\"];

  \"MainApp\" -> \"ModuleA\";
  \"MainApp\" -> \"ModuleB\";
  \"ModuleA\" -> \"DatabaseConnector\";
  \"ModuleA\" -> \"ModuleB\";
}}

DOT Language Output:",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn flowchart_graphical_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, \
generate a flowchart description in the **DOT language** suitable for rendering with Graphviz.

Represent the typical execution flow identified in the analysis. Use standard DOT syntax:
* Use `digraph G {{ ... }}`.
* Define nodes with labels (e.g., `node_id [label=\"Process Action\"];`). Use meaningful node IDs (e.g., `start`, `read_input`, `check_valid`, `process_data`, `end`).
* Define edges using `->` (e.g., `start -> read_input;`).
* Use diamond shapes for decisions (`node_id [label=\"Is Valid?\", shape=diamond];`).
* Label edges from decision nodes (e.g., `check_valid -> process_data [label=\"Yes\"]; check_valid -> log_error [label=\"No\"];`).
* Keep labels concise.

{}

Provide *only* the DOT language code block. Do not include explanations, backticks, or the word 'dot'. Start directly with `digraph G {{`.

Example DOT Output:
digraph G {{
  rankdir=TB;
  node [shape=box, style=rounded];

  start [label=\"Start\", shape=ellipse];
  read_input [label=\"Read Input File\"];
  check_valid [label=\"Is Data Valid?\", shape=diamond];
  process_data [label=\"Process Valid Data\"];
  log_error [label=\"Log Invalid Data Error\"];
  end_process [label=\"End Process\", shape=ellipse];

  start -> read_input;
  read_input -> check_valid;
  check_valid -> process_data [label=\"Yes\"];
  check_valid -> log_error [label=\"No\"];
  process_data -> end_process;
  log_error -> end_process;
}}

DOT Language Output:",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn sequence_diagram_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, generate a **Sequence Diagram** in **Mermaid syntax**.

Your goal is to illustrate a typical or primary interaction flow between key components (e.g., classes, objects, modules, functions).
1.  Identify the main participants involved in a significant interaction.
2.  Describe the sequence of messages or function calls between these participants.
3.  Use activations and deactivations if appropriate to show focus of control.
4.  Consider loops, alt (alternatives), and opt (optional) blocks if they are central to the interaction.

{}

Provide *ONLY* the Mermaid sequence diagram syntax code block itself, starting with `sequenceDiagram`.
Do not include any other explanatory text or markdown fences.

**Mermaid Sequence Diagram Syntax Guidelines:**
* Start with `sequenceDiagram`.
* Define participants: `participant Alice` or `actor Bob`.
* Messages:
    * Synchronous: `Alice->>John: Hello John, how are you?`
    * Asynchronous: `Alice->John: Message text`
    * Reply: `John-->>Alice: Great!`
* Activations: `activate John`, `deactivate John`
* Notes: `Note right of John: John is thinking.`
* Loops: `loop Every Minute` ... `end`
* Alternatives: `alt isSuccessful` ... `else isFailure` ... `end`
* Optional: `opt text` ... `end`

**Example Mermaid Output (just the syntax, no fences):**
sequenceDiagram
    participant User
    participant WebServer
    participant Database

    User->>WebServer: GET /data
    activate WebServer
    WebServer->>Database: query(\"SELECT * FROM records\")
    activate Database
    Database-->>WebServer: records
    deactivate Database
    WebServer-->>User: HTML Page with data
    deactivate WebServer

Mermaid Syntax Output (ONLY the syntax):",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn activity_diagram_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, generate a **UML Activity Diagram** in **Mermaid syntax**.

Your goal is to illustrate the flow of activities, decisions, and potentially parallel processes for a significant operation or the main execution path.
Focus on clarity and use standard, common Mermaid activity diagram features.

{}

Provide *ONLY* the Mermaid activity diagram syntax code block itself, starting with `graph TD` or `graph LR`.
Do not include any other explanatory text or markdown fences.

**Mermaid Activity Diagram Syntax Guidelines (MUST FOLLOW):**
* **Orientation:** Start with `graph TD` (Top-Down) or `graph LR` (Left-Right).
* **Start Node:** Use `A([Start])`.
* **End Node:** Use `Z([End])`.
* **Activities:** `activityId[\"Description of activity\"]` or `activityId(\"Description of activity\")`.
* **Decisions:** `decisionId{{\"Is condition met?\"}}`, then `decisionId -- Yes --> pathYesActivityId` and `decisionId -- No --> pathNoActivityId`.
* **Arrows:** Use `-->` for transitions.
* **Labels on Arrows:** `A -- \"Label text\" --> B`.
* **Subgraphs (optional, use sparingly):** `subgraph \"Group Title\"` ... `end`.
* **Quoting:** If text for node descriptions or edge labels contains spaces, parentheses, or special characters, enclose it in double quotes.

**Example Mermaid Output (just the syntax, no fences):**
graph TD
    A([Start]) --> B{{\"User Authentication?\"}};
    B -- Authenticated --> C[Process User Request];
    B -- Failed --> D[Display Authentication Error];
    C --> E[Generate Response Data];
    subgraph \"Data Formatting\"
        E --> F[\"Format Output for Display\"];
    end
    F --> G([End]);
    D --> G;

Mermaid Syntax Output (ONLY the syntax):",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn architecture_diagram_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, \
generate an **Architecture Diagram** in **Mermaid syntax** using a generic graph (`graph TD` or `graph LR`).

Your goal is to illustrate the high-level architecture, showing key components and their relationships.
1.  Identify major architectural components (e.g., services, modules, layers, databases, external APIs, UI components).
2.  Represent these components as nodes. Use clear, concise labels. Quote labels if they contain spaces or special characters.
3.  Show the primary relationships or data flows between these components using directed arrows (`-->`). Label arrows if the relationship type is important.
4.  Optionally, use subgraphs to group related components (e.g., `subgraph \"Backend Services\"` ... `end`).
5.  Keep the diagram high-level and focused on the main architectural structure.

{}

Provide *ONLY* the Mermaid graph syntax code block itself, starting with `graph TD` or `graph LR`.
Do not include any other explanatory text or markdown fences.

**Example Mermaid Output (just the syntax, no fences):**
graph TD
    A[\"User Interface (Web App)\"] --> B[\"API Gateway\"];
    B --> C1[\"Auth Service\"];
    B --> C2[\"Order Service\"];
    C2 -- \"writes to\" --> D[\"Order Database (PostgreSQL)\"];
    C2 -- \"sends event\" --> F[\"Notification Service\"];

    subgraph \"Core Services\"
        C1
        C2
    end

Mermaid Syntax Output (ONLY the syntax):",
        analysis_and_source_block(base_explanation, source)
    )
}

pub fn uml_structure_prompt(base_explanation: &str, source: &str) -> String {
    format!(
        "Based on the following detailed code analysis AND the original source code, \
extract information about classes, their attributes, methods, and relationships.

**Output Format (Strictly follow this text-based format):**
For each class, provide its details in a block like this:

CLASS: ClassName
ATTRIBUTES:
[+-#] attributeName1: typeName
METHODS:
[+-#] methodName1(param1: type, param2: type): returnType
--- (Use three hyphens as a separator before the next class block OR before relationships section)

After all classes, list relationships (if any):
RELATIONSHIP: SourceClassName -> TargetClassName [type=inheritance]
RELATIONSHIP: SourceClassName -> TargetClassName [type=aggregation, label=\"has a\"]
RELATIONSHIP: SourceClassName -> TargetClassName [type=composition, label=\"owns a\"]
RELATIONSHIP: SourceClassName -> TargetClassName [type=association, label=\"uses method of\"]
RELATIONSHIP: SourceClassName -> TargetClassName [type=dependency, label=\"depends on type\"]
(If no relationships, write \"RELATIONSHIP: None\")

**Details for Attributes and Methods:**
* Start each line with visibility: `+` (public), `-` (private), `#` (protected). Default to `+` if unclear.
* Attributes: `visibility attributeName: typeName`
* Methods: `visibility methodName(parameterName1: parameterType1, ...): returnType`. Use `void` if no return type.
* Write generic types as they appear, e.g. `List<String>`.

**Example Output:**
CLASS: User
ATTRIBUTES:
- userId: int
+ username: String
METHODS:
+ getProfile(): Profile
---
CLASS: Profile
ATTRIBUTES:
+ email: String
METHODS:
+ updateEmail(newEmail: String): boolean
---
RELATIONSHIP: User -> Profile [type=association, label=\"has profile\"]

{}

Structured Class Information Output:",
        analysis_and_source_block(base_explanation, source)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_prompt_embeds_source_between_markers() {
        let prompt = create_base_prompt("def f(): return 1");
        assert!(prompt.contains("--- Source Code Start ---\ndef f(): return 1\n--- Source Code End ---"));
        assert!(prompt.ends_with("Detailed Explanation:"));
    }

    #[test]
    fn test_dot_prompts_keep_literal_braces() {
        let prompt = call_graph_prompt("analysis", "code");
        assert!(prompt.contains("`digraph CallGraph {`"));
        assert!(prompt.contains("--- Original Source Code Start ---\ncode"));
    }
}
