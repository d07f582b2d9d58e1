use serde::{Deserialize, Serialize};

/// Named prompting techniques available for seeding a card.
///
/// The wire form of each key is its camelCase name (`"cot"`,
/// `"requirementsSimulator"`, ...), matching what the UI layer sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKey {
    Cot,
    Meta,
    Persona,
    Template,
    Refinement,
    Alternatives,
    RequirementsSimulator,
    SpecificationDisambiguation,
    ApiGenerator,
    ApiSimulator,
    FewShotCodeExampleGeneration,
    DslCreation,
    ArchitecturalPossibilities,
    ChangeRequestSimulation,
    CodeClustering,
    IntermediateAbstraction,
    PrincipledCode,
    HiddenAssumptions,
    PseudoCodeRefactoring,
    DataGuidedRefactoring,
}

/// Display grouping for the pattern library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Core,
    RequirementsElicitation,
    SystemDesign,
    CodeQuality,
    Refactoring,
}

impl PatternCategory {
    pub fn label(self) -> &'static str {
        match self {
            PatternCategory::Core => "Core Patterns",
            PatternCategory::RequirementsElicitation => "Requirements Elicitation",
            PatternCategory::SystemDesign => "System Design and Simulation",
            PatternCategory::CodeQuality => "Code Quality",
            PatternCategory::Refactoring => "Refactoring",
        }
    }
}

impl PatternKey {
    /// Every pattern, in library display order.
    pub const ALL: [PatternKey; 20] = [
        PatternKey::Cot,
        PatternKey::Meta,
        PatternKey::Persona,
        PatternKey::Template,
        PatternKey::Refinement,
        PatternKey::Alternatives,
        PatternKey::RequirementsSimulator,
        PatternKey::SpecificationDisambiguation,
        PatternKey::ApiGenerator,
        PatternKey::ApiSimulator,
        PatternKey::FewShotCodeExampleGeneration,
        PatternKey::DslCreation,
        PatternKey::ArchitecturalPossibilities,
        PatternKey::ChangeRequestSimulation,
        PatternKey::CodeClustering,
        PatternKey::IntermediateAbstraction,
        PatternKey::PrincipledCode,
        PatternKey::HiddenAssumptions,
        PatternKey::PseudoCodeRefactoring,
        PatternKey::DataGuidedRefactoring,
    ];

    /// The fixed template string a card seeded from this pattern starts with.
    pub fn template(self) -> &'static str {
        match self {
            PatternKey::Cot => "Think step by step to solve this problem:\n\n",
            PatternKey::Meta => "Please generate a prompt that would help me:\n\n",
            PatternKey::Persona => "You are a [ROLE]. Your task is to:\n\n",
            PatternKey::Template => {
                "Given [INPUT], please [ACTION] and provide [OUTPUT]:\n\n"
            }
            PatternKey::Refinement => {
                "Help me refine this question to get better results:\n\n"
            }
            PatternKey::Alternatives => "Provide 3 different approaches to:\n\n",
            PatternKey::RequirementsSimulator => {
                "I want you to act as the system. Use the requirements to guide your behavior. \
                 I will ask you to do X, and you will tell me if X is possible given the \
                 requirements. If X is possible, explain why using the requirements. If I \
                 can't do X based on the requirements, write the missing requirements needed \
                 in format Y."
            }
            PatternKey::SpecificationDisambiguation => {
                "Within this scope. Consider these requirements or specifications. Point out \
                 any areas of ambiguity or potentially unintended outcomes"
            }
            PatternKey::ApiGenerator => {
                "Using system description X. Generate an API specification for the system. \
                 The API specification should be in format Y"
            }
            PatternKey::ApiSimulator => {
                "Act as the described system using specification X. I will type in requests \
                 to the API in format Y. You will respond with the appropriate response in \
                 format Z based on specification X"
            }
            PatternKey::FewShotCodeExampleGeneration => {
                "I am going to provide you system X. Create a set of N examples that \
                 demonstrate usage of system X. Make the examples as complete as possible in \
                 their coverage. (Optionally) The examples should be based on the public \
                 interfaces of system X. (Optionally) The examples should focus on X"
            }
            PatternKey::DslCreation => {
                "I want you to create a domain-specific language for X. The syntax of the \
                 language must adhere to the following constraints. Explain the language to \
                 me and provide some examples"
            }
            PatternKey::ArchitecturalPossibilities => {
                "I am developing a software system with X for Y. The system must adhere to \
                 these constraints. Describe N possible architectures for this system. \
                 Describe the architecture in terms of Q"
            }
            PatternKey::ChangeRequestSimulation => {
                "My software system architecture is X. The system must adhere to these \
                 constraints. I want you to simulate a change to the system that I will \
                 describe. Describe the impact of that change in terms of Q. This is the \
                 change to my system"
            }
            PatternKey::CodeClustering => {
                "Within scope X. I want you to write or refactor code in a way that \
                 separates code with property Y from code that has property Z. if bad. \
                 These are examples of code with property Y. These are examples of code \
                 with property Z."
            }
            PatternKey::IntermediateAbstraction => {
                "If you write or refactor code with property X. that uses other code with \
                 property Y. (Optionally) Define property X. (Optionally) Define property \
                 Y. Insert an intermediate abstraction Z between X and Y. (Optionally) \
                 Abstraction Z should have these properties"
            }
            PatternKey::PrincipledCode => {
                "Within this scope. Generate, refactor, or create code to adhere to named \
                 Principle X"
            }
            PatternKey::HiddenAssumptions => {
                "Within this scope. List the assumptions that this code makes. (Optionally) \
                 Estimate how hard it would be to change these assumptions or their \
                 likelyhood of changing"
            }
            PatternKey::PseudoCodeRefactoring => {
                "Refactor the code. So that it matches this pseudo-code. Match the \
                 structure of the pseudo-code as closely as possible"
            }
            PatternKey::DataGuidedRefactoring => {
                "Refactor the code. So that its input, output, or stored data format is X. \
                 Provide one or more examples of X"
            }
        }
    }

    /// Human-readable name for toolbar buttons and listings.
    pub fn display_name(self) -> &'static str {
        match self {
            PatternKey::Cot => "Chain of Thought",
            PatternKey::Meta => "Meta Language Generation",
            PatternKey::Persona => "Persona Pattern",
            PatternKey::Template => "Template Pattern",
            PatternKey::Refinement => "Question Refinement",
            PatternKey::Alternatives => "Alternative Approaches",
            PatternKey::RequirementsSimulator => "Requirements Simulator",
            PatternKey::SpecificationDisambiguation => "Specification Disambiguation",
            PatternKey::ApiGenerator => "API Generator",
            PatternKey::ApiSimulator => "API Simulator",
            PatternKey::FewShotCodeExampleGeneration => "Few-Shot Code Examples",
            PatternKey::DslCreation => "DSL Creation",
            PatternKey::ArchitecturalPossibilities => "Architectural Possibilities",
            PatternKey::ChangeRequestSimulation => "Change Request Simulation",
            PatternKey::CodeClustering => "Code Clustering",
            PatternKey::IntermediateAbstraction => "Intermediate Abstraction",
            PatternKey::PrincipledCode => "Principled Code",
            PatternKey::HiddenAssumptions => "Hidden Assumptions",
            PatternKey::PseudoCodeRefactoring => "Pseudo-Code Refactoring",
            PatternKey::DataGuidedRefactoring => "Data-Guided Refactoring",
        }
    }

    pub fn category(self) -> PatternCategory {
        match self {
            PatternKey::Cot
            | PatternKey::Meta
            | PatternKey::Persona
            | PatternKey::Template
            | PatternKey::Refinement
            | PatternKey::Alternatives => PatternCategory::Core,
            PatternKey::RequirementsSimulator | PatternKey::SpecificationDisambiguation => {
                PatternCategory::RequirementsElicitation
            }
            PatternKey::ApiGenerator
            | PatternKey::ApiSimulator
            | PatternKey::FewShotCodeExampleGeneration
            | PatternKey::DslCreation
            | PatternKey::ArchitecturalPossibilities
            | PatternKey::ChangeRequestSimulation => PatternCategory::SystemDesign,
            PatternKey::CodeClustering
            | PatternKey::IntermediateAbstraction
            | PatternKey::PrincipledCode
            | PatternKey::HiddenAssumptions => PatternCategory::CodeQuality,
            PatternKey::PseudoCodeRefactoring | PatternKey::DataGuidedRefactoring => {
                PatternCategory::Refactoring
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKey::Cot => "cot",
            PatternKey::Meta => "meta",
            PatternKey::Persona => "persona",
            PatternKey::Template => "template",
            PatternKey::Refinement => "refinement",
            PatternKey::Alternatives => "alternatives",
            PatternKey::RequirementsSimulator => "requirementsSimulator",
            PatternKey::SpecificationDisambiguation => "specificationDisambiguation",
            PatternKey::ApiGenerator => "apiGenerator",
            PatternKey::ApiSimulator => "apiSimulator",
            PatternKey::FewShotCodeExampleGeneration => "fewShotCodeExampleGeneration",
            PatternKey::DslCreation => "dslCreation",
            PatternKey::ArchitecturalPossibilities => "architecturalPossibilities",
            PatternKey::ChangeRequestSimulation => "changeRequestSimulation",
            PatternKey::CodeClustering => "codeClustering",
            PatternKey::IntermediateAbstraction => "intermediateAbstraction",
            PatternKey::PrincipledCode => "principledCode",
            PatternKey::HiddenAssumptions => "hiddenAssumptions",
            PatternKey::PseudoCodeRefactoring => "pseudoCodeRefactoring",
            PatternKey::DataGuidedRefactoring => "dataGuidedRefactoring",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        PatternKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
    }
}
