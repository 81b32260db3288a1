//! Prompt builders for each migration step.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use transmute_types::{FALLBACK_PATH_PREFIX, ProjectScan, SourceSummary, WRITE_FILE_TOOL};

/// Output file the initial analysis is asked to produce.
pub const ANALYSIS_NOTES_FILE: &str = "migration_analysis_notes.md";

pub fn initial_analysis(scan: &ProjectScan, target_framework: &str) -> String {
    let mut prompt = format!(
        "Analyze the structure of a Java project. Key findings during scan:\n\
         - Potential build files found: {build:?}\n\
         - Potential config files found: {config:?}\n\
         - Java source structure exists: {src}\n\
         - Java files count: {count}\n",
        build = scan.build_files,
        config = scan.config_files,
        src = scan.src_main_java_exists,
        count = scan.java_files.len(),
    );
    if let Some(pom) = scan.pom_xml_head.as_deref() {
        let _ = write!(prompt, "- Start of pom.xml content:\n```xml\n{pom}\n```\n");
    }
    let _ = write!(
        prompt,
        "\nTASK:\n\
         1. Based on these findings, what is the most likely original Java framework or \
         primary technology stack? Briefly explain your reasoning.\n\
         2. Identify 2-3 key challenges to focus on when migrating this type of project to \
         '{target_framework}' with MongoDB.\n\n\
         CRITICAL INSTRUCTION: You MUST use the '{WRITE_FILE_TOOL}' function to save your \
         complete analysis (points 1 and 2 combined) into a markdown file named \
         '{ANALYSIS_NOTES_FILE}'. Use the analysis summary as the 'reason'. Do NOT output the \
         analysis as plain text in your response.\n"
    );
    prompt
}

pub fn dependencies(target_framework: &str) -> String {
    format!(
        "TASK: Generate the Maven dependencies needed for a new project using \
         '{target_framework}'.\n\
         The project needs to:\n\
         1. Build a web application exposing RESTful APIs.\n\
         2. Connect to and interact with a MongoDB database, using the idiomatic data access \
         library for {target_framework}.\n\
         3. Include standard {target_framework} core functionality.\n\n\
         CRITICAL INSTRUCTION: You MUST use the '{WRITE_FILE_TOOL}' function to create a basic \
         'pom.xml' file in the output directory. It should use the standard parent/structure \
         for {target_framework} if one exists and include the generated dependencies. If unsure \
         about the full structure, wrap the dependencies in `<dependencies>...</dependencies>` \
         tags within the file content. Reason should be 'Generated initial pom.xml'. Do NOT \
         output the pom.xml content as plain text in your response.\n"
    )
}

/// Configuration file name and format for `target_framework`.
#[must_use]
pub fn config_file_for(target_framework: &str) -> (&'static str, &'static str) {
    if target_framework.to_lowercase().contains("spring boot") {
        ("application.yml", "YAML")
    } else {
        ("application.properties", "properties")
    }
}

pub fn configuration(target_framework: &str) -> String {
    let (file_name, format) = config_file_for(target_framework);
    format!(
        "TASK: Generate a basic configuration for a '{target_framework}' application to \
         connect to a MongoDB database.\n\
         Assume:\n\
         - MongoDB is running on localhost:27017.\n\
         - The database name is 'migrated_db'.\n\
         - Include standard connection properties, with placeholders or comments for \
         username/password.\n\n\
         Format the configuration for '{file_name}' (use {format} format).\n\n\
         CRITICAL INSTRUCTION: You MUST use the '{WRITE_FILE_TOOL}' function to save this \
         configuration into 'src/main/resources/{file_name}' within the output directory. \
         Reason should be 'Generated MongoDB configuration'. Do NOT output the configuration \
         as plain text in your response.\n"
    )
}

/// Inputs for one per-file translation prompt.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub target_framework: &'a str,
    pub source_framework_guess: &'a str,
    pub relative_path: &'a str,
    pub source_code: &'a str,
    pub summary: Option<&'a SourceSummary>,
    pub is_model: bool,
}

pub fn translation(req: &TranslationRequest<'_>) -> String {
    let target = req.target_framework;
    let mut prompt = format!(
        "CONTEXT:\n\
         - Source Project Framework (estimated): {guess}\n\
         - Target Project Framework: {target}\n\
         - Target Database: MongoDB\n\
         - Source File Relative Path: {path}\n",
        guess = req.source_framework_guess,
        path = req.relative_path,
    );
    prompt.push_str(&structure_context(req.relative_path, req.summary));

    let _ = write!(
        prompt,
        "\n\nSOURCE CODE to translate:\n```java\n{code}\n```\n\n\
         TASK:\n\
         1. Analyze the source code. What is its likely role (JPA Entity, EJB Service Bean, \
         Servlet, utility class)? Use this analysis as the 'reason' argument later.\n\
         2. Translate this Java code to be idiomatic for '{target}' using MongoDB.\n\
         - If it is a JPA Entity or similar data object, convert it to a MongoDB document \
         class, mapping annotations (@Id, @Column, @Transient, relationships) and types \
         appropriately, and explain how relationships are handled.\n",
        code = req.source_code,
    );
    if req.is_model {
        prompt.push_str(
            "- SCHEMA RECOMMENDATIONS (add as JavaDoc comments in the translated code):\n\
             \x20 - For related data implied by relationship annotations, recommend whether it \
             should be EMBEDDED in this document or REFERENCED by id, with the trade-offs.\n\
             \x20 - Suggest @Indexed annotations on fields commonly used for filtering or \
             sorting, beyond the primary @Id, and explain why.\n",
        );
    }
    let _ = write!(
        prompt,
        "- If it is an EJB or similar service/component, convert it to a {target} bean using \
         constructor injection, replacing Java EE specific APIs with {target} equivalents.\n\
         - Adjust imports and package declarations. Assume a base target package of \
         'com.migratedapp' with subpackages such as .model, .service and .controller. Keep the \
         original class name unless the translation implies a change.\n\
         - Add JavaDoc comments explaining significant changes, assumptions, and areas that \
         need manual review.\n\
         3. Choose a relative path and file name for the translated file within a standard \
         '{target}' project layout (e.g. 'src/main/java/com/migratedapp/model/Order.java').\n\n\
         CRITICAL INSTRUCTION: You MUST use the '{WRITE_FILE_TOOL}' function to save the \
         complete translated Java code, including package declaration and imports, to the path \
         chosen in step 3. Provide the role analysis from step 1 as the 'reason' argument. Do \
         NOT output the translated code as plain text in your response.\n\n\
         FALLBACK INSTRUCTION: If you absolutely cannot use the '{WRITE_FILE_TOOL}' function, \
         start your response immediately with a single line exactly like this:\n\
         {FALLBACK_PATH_PREFIX} [intended relative output path, e.g. \
         src/main/java/com/migratedapp/model/MyModel.java]\n\
         followed by a newline and then the complete translated code.\n"
    );
    prompt
}

fn structure_context(relative_path: &str, summary: Option<&SourceSummary>) -> String {
    let Some(summary) = summary else {
        return "No structural analysis available for source file.".to_string();
    };
    let types: Vec<String> = summary
        .types
        .iter()
        .map(|t| {
            let mut line = format!("  - {} {}", t.kind, t.name);
            if !t.extends.is_empty() {
                let _ = write!(line, " extends {}", t.extends.join(", "));
            }
            if !t.implements.is_empty() {
                let _ = write!(line, " implements {}", t.implements.join(", "));
            }
            line
        })
        .collect();
    format!(
        "\nSource File Structural Analysis ({relative_path}):\n\
         - Package: {package}\n\
         - Imports Count: {imports}\n\
         - Detected Types:\n{types}",
        package = summary.package.as_deref().unwrap_or("N/A"),
        imports = summary.imports.len(),
        types = if types.is_empty() {
            "    None".to_string()
        } else {
            types.join("\n")
        },
    )
}

pub fn dependency_suggestions(imports: &BTreeSet<String>) -> String {
    let import_list = imports
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "CONTEXT:\n\
         The following Java imports were found in the automatically translated source code of \
         a project being migrated to Spring Boot and MongoDB:\n\n\
         {import_list}\n\n\
         TASK:\n\
         Based only on these imports, suggest additional Maven dependencies that might be \
         required beyond 'spring-boot-starter-web' and 'spring-boot-starter-data-mongodb', \
         which are assumed to be present.\n\n\
         Provide your suggestions as XML `<dependency>...</dependency>` blocks.\n\
         - For common libraries (Apache Commons, Guava, Jackson, JUnit 5, Mockito), provide \
         standard coordinates.\n\
         - For dependencies managed by the Spring Boot BOM, OMIT the `<version>` tag.\n\
         - If you are unsure about a dependency for a less common import, say so.\n\
         - Do NOT include dependencies already covered by the two starters above.\n\n\
         If no additional dependencies seem necessary, state that clearly.\n"
    )
}
