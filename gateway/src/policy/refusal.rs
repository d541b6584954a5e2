//! Pre-generation screen: disallowed-intent refusals and prompt-injection
//! blocks. Patterns are case-insensitive and cover en/de/fr/it phrasing.

use config::RefusalPattern;
use errors::ConfigError;
use lex_core::{PolicyDecision, PolicyReason};
use regex::Regex;

const PERSONALIZED_REPRESENTATION: &[&str] = &[
    r"\b(represent|defend)\s+(me|us|my\s+(company|client|family))\b",
    r"\b(be|act\s+as|become)\s+my\s+(lawyer|attorney|counsel|advocate|legal\s+representative)\b",
    r"\b(vertreten|verteidigen)\s+sie\s+(mich|uns)\b",
    r"\b(mich|uns)\s+(vor\s+gericht\s+)?(zu\s+)?(vertreten|verteidigen)\b",
    r"\bmein(e|en)?\s+(anwalt|anwältin|rechtsanwalt|rechtsanwältin|vertreter)\s+(sein|werden)\b",
    r"\b(me|nous)\s+(représenter|defendre|défendre)\b",
    r"\b(représentez|défendez)[- ](moi|nous)\b",
    r"\bêtre\s+mon\s+avocat\b",
    r"\b(rappresentarmi|difendermi|rappresentarci)\b",
    r"\bessere\s+il\s+mio\s+avvocato\b",
];

const FILING_ACTION: &[&str] = &[
    r"\b(file|submit|lodge)\s+(my|our)\b",
    r"\b(file|submit|lodge)\s+(it|this|that|the\s+\w+|an?\s+\w+)\s+(for|on\s+behalf\s+of)\s+(me|us)\b",
    r"\b(can|could|will|would)\s+you\s+(please\s+)?(file|submit|lodge)\b",
    r"\b(draft|write|prepare)\s+(my|our|me\s+an?|me\s+the)\s+(\w+\s+)?(appeal|complaint|lawsuit|petition|objection|brief|submission|statement\s+of\s+claim)\b",
    r"\bfür\s+mich\s+(eine?n?\s+)?(klage|beschwerde|einsprache|rekurs|gesuch|antrag|eingabe)\b",
    r"\b(klage|beschwerde|einsprache|rekurs|gesuch|antrag)\b.*\bfür\s+mich\b.*\b(einreichen|einlegen|erheben|verfassen)\b",
    r"\b(reichen|legen|erheben)\s+sie\s+(meine|unsere)\b",
    r"\b(déposer|deposer|introduire|rédiger)\s+(ma|mon|mes|notre)\s+(\w+\s+)?(demande|recours|plainte|requête|opposition)\b",
    r"\b(déposez|rédigez)[- ](moi|pour\s+moi)\b",
    r"\b(presentare|depositare|inoltrare|redigere)\s+(il\s+mio|la\s+mia|per\s+me)\s+(\w+\s+)?(ricorso|domanda|denuncia|istanza|opposizione)?\b",
];

const CASE_STRATEGY: &[&str] = &[
    r"\b(how\s+(can|do|should)\s+i\s+win|(will|would|can)\s+i\s+win)\b",
    r"\b(what|which)\s+(is\s+)?(the\s+)?best\s+(legal\s+)?strategy\b",
    r"\bstrategy\s+(for|in)\s+my\s+(case|trial|lawsuit|dispute|appeal|proceedings)\b",
    r"\bmy\s+chances\s+of\s+(winning|success)\b",
    r"\bshould\s+i\s+(sue|appeal|settle|plead\s+guilty)\b",
    r"\b(wie\s+gewinne\s+ich|gewinne\s+ich)\b",
    r"\bstrategie\s+für\s+(meinen|mein|meine)\s+(fall|prozess|verfahren|rechtsstreit)\b",
    r"\bmeine\s+(erfolgs)?chancen\b",
    r"\bsoll\s+ich\s+(klagen|rekurs|beschwerde|einen\s+vergleich)\b",
    r"\bstratégie\s+pour\s+(mon|ma)\s+(affaire|procès|dossier|recours|litige)\b",
    r"\bmes\s+chances\s+de\s+(gagner|succès)\b",
    r"\bcomment\s+gagner\s+(mon|ma)\b",
    r"\bstrategia\s+per\s+(il\s+mio|la\s+mia)\s+(caso|causa|processo|ricorso)\b",
    r"\ble\s+mie\s+possibilità\s+di\s+(vincere|successo)\b",
    r"\bcome\s+(posso\s+)?vincere\s+(il\s+mio|la\s+mia)\b",
];

const PROMPT_INJECTION: &[&str] = &[
    r"\bignore\s+(all\s+)?(of\s+)?(the\s+|your\s+)?(previous|prior|above|earlier)\s+(instructions|prompts|rules|messages)\b",
    r"\bdisregard\s+(all\s+)?(your|the|previous|prior)\s+(rules|instructions|guidelines)\b",
    r"\b(reveal|show|print|repeat|output)\s+(me\s+)?(your|the)\s+(system\s+prompt|hidden\s+instructions|initial\s+instructions)\b",
    r"\byou\s+are\s+now\s+(in\s+)?(developer\s+mode|dan|jailbroken|unrestricted)\b",
    r"\bignoriere\s+(alle\s+)?(vorherigen|bisherigen|obigen)\s+(anweisungen|regeln)\b",
    r"\b(zeige|verrate)\s+(mir\s+)?(deinen|den)\s+systemprompt\b",
    r"\bignore[rz]?\s+(toutes\s+)?(les\s+)?instructions\s+(précédentes|antérieures)\b",
    r"\bignora\s+(tutte\s+)?le\s+istruzioni\s+precedenti\b",
];

struct Rule {
    reason: PolicyReason,
    pattern: Regex
}

pub struct RefusalScreen {
    injection: Vec<Regex>,
    rules: Vec<Rule>
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("(?i){pattern}"))
        .map_err(|e| ConfigError::invalid(format!("refusal pattern '{pattern}' is invalid: {e}")))
}

impl RefusalScreen {
    pub fn new(extra: &[RefusalPattern]) -> Result<Self, ConfigError> {
        let injection = PROMPT_INJECTION
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let builtin = [
            (PolicyReason::PersonalizedRepresentation, PERSONALIZED_REPRESENTATION),
            (PolicyReason::FilingAction, FILING_ACTION),
            (PolicyReason::CaseStrategy, CASE_STRATEGY)
        ];

        let mut rules = Vec::new();
        for (reason, patterns) in builtin {
            for pattern in patterns {
                rules.push(Rule {
                    reason,
                    pattern: compile(pattern)?
                });
            }
        }
        for extra in extra {
            rules.push(Rule {
                reason: extra.reason,
                pattern: compile(&extra.pattern)?
            });
        }

        Ok(Self { injection, rules })
    }

    pub fn screen(&self, message: &str) -> PolicyDecision {
        if self.injection.iter().any(|re| re.is_match(message)) {
            return PolicyDecision::block(PolicyReason::PromptInjection);
        }
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(message))
            .map_or_else(PolicyDecision::allow, |rule| PolicyDecision::refuse(rule.reason))
    }
}
