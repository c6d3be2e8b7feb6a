//! Toolchain registry
//!
//! Maps a language identifier to the recipe used to build and run it.
//! Recipes are plain data; only C# needs runtime discovery, which is
//! delegated to [`DotnetWarmup`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::error::{Error, Result};
use crate::sandbox::dotnet::{DotnetCompiler, DotnetWarmup};

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Php,
    C,
    Cpp,
    Java,
    CSharp,
}

impl Language {
    /// Every registered language, in display order
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Php,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::CSharp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Php => "php",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::CSharp => "csharp",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            "typescript" => Ok(Language::TypeScript),
            "php" => Ok(Language::Php),
            "c" => Ok(Language::C),
            "cpp" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "csharp" => Ok(Language::CSharp),
            _ => Err(Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A program plus its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Deterministic rewrite applied to submitted source before it hits disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePreprocessor {
    /// Prepend `prefix` unless the trimmed source already starts with `marker`
    PrependUnlessStartsWith {
        marker: &'static str,
        prefix: &'static str,
    },
}

impl SourcePreprocessor {
    pub fn apply(&self, source: &str) -> String {
        match self {
            SourcePreprocessor::PrependUnlessStartsWith { marker, prefix } => {
                if source.is_empty() || source.trim().starts_with(marker) {
                    source.to_string()
                } else {
                    format!("{}{}", prefix, source)
                }
            }
        }
    }
}

/// An auxiliary file written next to the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportFile {
    pub name: String,
    pub contents: String,
}

/// Build/run recipe for one language
#[derive(Debug, Clone)]
pub struct ToolchainSpec {
    pub language: Language,
    /// File name the submitted source is written to
    pub source_file: String,
    /// Compile step; `None` for interpreted languages
    pub compile: Option<CommandLine>,
    /// File that must exist after a failed compile for the run to proceed
    pub artifact: Option<String>,
    pub run: CommandLine,
    pub preprocessor: Option<SourcePreprocessor>,
    pub support_files: Vec<SupportFile>,
    /// Extra environment for both stages
    pub env: Vec<(String, String)>,
    /// Point HOME (and DOTNET_CLI_HOME) at the workspace
    pub home_in_workspace: bool,
}

impl ToolchainSpec {
    fn interpreted(language: Language, source_file: &str, program: &str) -> Self {
        ToolchainSpec {
            language,
            source_file: source_file.to_string(),
            compile: None,
            artifact: None,
            run: CommandLine::new(program, [source_file]),
            preprocessor: None,
            support_files: Vec::new(),
            env: Vec::new(),
            home_in_workspace: false,
        }
    }

    fn compiled(
        language: Language,
        source_file: &str,
        compile: CommandLine,
        artifact: &str,
        run: CommandLine,
    ) -> Self {
        ToolchainSpec {
            language,
            source_file: source_file.to_string(),
            compile: Some(compile),
            artifact: Some(artifact.to_string()),
            run,
            preprocessor: None,
            support_files: Vec::new(),
            env: Vec::new(),
            home_in_workspace: false,
        }
    }

    /// Source text as it should be written to disk
    pub fn prepare_source(&self, source: &str) -> String {
        match &self.preprocessor {
            Some(preprocessor) => preprocessor.apply(source),
            None => source.to_string(),
        }
    }

    /// Programs this recipe needs on PATH
    pub fn required_tools(&self) -> Vec<&str> {
        let mut tools = Vec::new();
        for program in self
            .compile
            .iter()
            .map(|c| c.program.as_str())
            .chain(std::iter::once(self.run.program.as_str()))
        {
            if !program.starts_with("./") && !tools.contains(&program) {
                tools.push(program);
            }
        }
        tools
    }

    /// Required programs that cannot be found on PATH
    pub fn missing_tools(&self) -> Vec<String> {
        self.required_tools()
            .into_iter()
            .filter(|tool| which::which(tool).is_err())
            .map(str::to_string)
            .collect()
    }
}

/// Recipe for every language that needs no runtime discovery
fn static_recipe(language: Language) -> Option<ToolchainSpec> {
    let spec = match language {
        Language::Python => ToolchainSpec::interpreted(language, "main.py", "python3"),
        Language::JavaScript => ToolchainSpec::interpreted(language, "main.js", "node"),
        Language::TypeScript => ToolchainSpec::compiled(
            language,
            "main.ts",
            CommandLine::new(
                "tsc",
                ["main.ts", "--target", "es2020", "--module", "commonjs", "--outDir", "."],
            ),
            "main.js",
            CommandLine::new("node", ["main.js"]),
        ),
        Language::Php => ToolchainSpec {
            preprocessor: Some(SourcePreprocessor::PrependUnlessStartsWith {
                marker: "<?",
                prefix: "<?php\n",
            }),
            ..ToolchainSpec::interpreted(language, "main.php", "php")
        },
        Language::C => ToolchainSpec::compiled(
            language,
            "main.c",
            CommandLine::new("gcc", ["main.c", "-o", "app"]),
            "app",
            CommandLine::new("./app", Vec::<String>::new()),
        ),
        Language::Cpp => ToolchainSpec::compiled(
            language,
            "main.cpp",
            CommandLine::new("g++", ["main.cpp", "-o", "app", "-std=c++17"]),
            "app",
            CommandLine::new("./app", Vec::<String>::new()),
        ),
        Language::Java => ToolchainSpec::compiled(
            language,
            "Main.java",
            CommandLine::new("javac", ["-encoding", "UTF-8", "Main.java"]),
            "Main.class",
            CommandLine::new("java", ["Main"]),
        ),
        Language::CSharp => return None,
    };
    Some(spec)
}

const CSHARP_SOURCE: &str = "Program.cs";

fn dotnet_env() -> Vec<(String, String)> {
    [
        ("DOTNET_NOLOGO", "true"),
        ("DOTNET_CLI_TELEMETRY_OPTOUT", "true"),
        ("DOTNET_SKIP_FIRST_TIME_EXPERIENCE", "true"),
        ("DOTNET_MULTILEVEL_LOOKUP", "0"),
        ("DOTNET_TieredCompilation", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// C# via the Roslyn compiler directly, using the cached reference list
fn csharp_warm_recipe(compiler: &DotnetCompiler) -> ToolchainSpec {
    let runtime_config = serde_json::json!({
        "runtimeOptions": {
            "tfm": compiler.target_framework,
            "framework": {
                "name": "Microsoft.NETCore.App",
                "version": compiler.framework_version,
            }
        }
    });

    ToolchainSpec {
        language: Language::CSharp,
        source_file: CSHARP_SOURCE.to_string(),
        compile: Some(CommandLine::new(
            "dotnet",
            [
                compiler.csc.display().to_string(),
                "/nologo".to_string(),
                "/target:exe".to_string(),
                "/out:app.exe".to_string(),
                format!("@{}", compiler.references.display()),
                CSHARP_SOURCE.to_string(),
            ],
        )),
        artifact: Some("app.exe".to_string()),
        run: CommandLine::new("dotnet", ["./app.exe"]),
        preprocessor: None,
        support_files: vec![SupportFile {
            name: "app.runtimeconfig.json".to_string(),
            contents: serde_json::to_string_pretty(&runtime_config).unwrap_or_default(),
        }],
        env: dotnet_env(),
        home_in_workspace: true,
    }
}

const CSHARP_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net8.0</TargetFramework>
    <ImplicitUsings>enable</ImplicitUsings>
    <Nullable>enable</Nullable>
    <AssemblyName>app</AssemblyName>
  </PropertyGroup>
</Project>"#;

/// C# via `dotnet build`, used when warm-up is unavailable
fn csharp_project_recipe() -> ToolchainSpec {
    ToolchainSpec {
        language: Language::CSharp,
        source_file: CSHARP_SOURCE.to_string(),
        compile: Some(CommandLine::new("dotnet", ["build", "-c", "Debug"])),
        artifact: Some("bin/Debug/net8.0/app".to_string()),
        run: CommandLine::new("./bin/Debug/net8.0/app", Vec::<String>::new()),
        preprocessor: None,
        support_files: vec![SupportFile {
            name: "app.csproj".to_string(),
            contents: CSHARP_PROJECT.to_string(),
        }],
        env: dotnet_env(),
        home_in_workspace: true,
    }
}

/// Registry of build/run recipes
pub struct ToolchainRegistry {
    dotnet: DotnetWarmup,
}

impl ToolchainRegistry {
    /// Create a registry from sandbox configuration
    pub fn new(config: &SandboxConfig) -> Self {
        ToolchainRegistry {
            dotnet: DotnetWarmup::new(&config.dotnet.root, &config.dotnet.cache_dir),
        }
    }

    /// Look up a recipe by language identifier
    pub async fn lookup(&self, language: &str) -> Result<ToolchainSpec> {
        let language: Language = language.parse()?;
        Ok(self.resolve(language).await)
    }

    /// Recipe for a known language
    pub async fn resolve(&self, language: Language) -> ToolchainSpec {
        if let Some(spec) = static_recipe(language) {
            return spec;
        }

        match self.dotnet.prepare().await {
            Ok(compiler) => csharp_warm_recipe(&compiler),
            Err(e) => {
                warn!("C# warm-up unavailable, using project build: {}", e);
                csharp_project_recipe()
            }
        }
    }

    /// Run one-time toolchain warm-up eagerly
    pub async fn warm_up(&self) -> Result<()> {
        let compiler = self.dotnet.prepare().await?;
        debug!(
            "C# warm-up complete (references: {})",
            compiler.references.display()
        );
        Ok(())
    }

    /// Supported language identifiers
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL.to_vec()
    }
}
