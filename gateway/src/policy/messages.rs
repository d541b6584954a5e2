//! Localized user-facing texts attached to answers and safe responses.

use lex_core::{Locale, PolicyReason};

pub fn disclaimer(locale: Locale) -> &'static str {
    match locale {
        Locale::En => {
            "This is general legal information about Swiss law, not legal advice. It does not \
             replace advice from a qualified lawyer for your specific situation."
        }
        Locale::De => {
            "Dies ist eine allgemeine rechtliche Information zum Schweizer Recht und keine \
             Rechtsberatung. Sie ersetzt nicht die Beratung durch eine qualifizierte \
             Rechtsanwältin oder einen qualifizierten Rechtsanwalt."
        }
        Locale::Fr => {
            "Il s'agit d'une information juridique générale sur le droit suisse, et non d'un \
             conseil juridique. Elle ne remplace pas l'avis d'un avocat qualifié."
        }
        Locale::It => {
            "Si tratta di un'informazione giuridica generale sul diritto svizzero e non di una \
             consulenza legale. Non sostituisce il parere di un avvocato qualificato."
        }
    }
}

pub fn refusal(locale: Locale, reason: PolicyReason) -> &'static str {
    match (locale, reason) {
        (Locale::En, PolicyReason::CaseStrategy) => {
            "I can't assess your chances or plan a strategy for your case. I can explain the \
             general legal rules that apply, with references to official sources."
        }
        (Locale::En, _) => {
            "I can't represent you or file documents on your behalf. I can explain the general \
             legal rules and procedures, with references to official sources."
        }
        (Locale::De, PolicyReason::CaseStrategy) => {
            "Ich kann Ihre Erfolgsaussichten nicht beurteilen und keine Prozessstrategie \
             entwickeln. Ich kann die allgemein geltenden Regeln mit Verweisen auf amtliche \
             Quellen erklären."
        }
        (Locale::De, _) => {
            "Ich kann Sie nicht vertreten und keine Eingaben in Ihrem Namen einreichen. Ich kann \
             die allgemeinen Regeln und Verfahren mit Verweisen auf amtliche Quellen erklären."
        }
        (Locale::Fr, PolicyReason::CaseStrategy) => {
            "Je ne peux pas évaluer vos chances ni élaborer une stratégie pour votre affaire. Je \
             peux expliquer les règles générales applicables, avec des références aux sources \
             officielles."
        }
        (Locale::Fr, _) => {
            "Je ne peux pas vous représenter ni déposer de documents en votre nom. Je peux \
             expliquer les règles et procédures générales, avec des références aux sources \
             officielles."
        }
        (Locale::It, PolicyReason::CaseStrategy) => {
            "Non posso valutare le sue possibilità né elaborare una strategia per il suo caso. \
             Posso spiegare le regole generali applicabili, con riferimenti alle fonti ufficiali."
        }
        (Locale::It, _) => {
            "Non posso rappresentarla né depositare atti a suo nome. Posso spiegare le regole e \
             le procedure generali, con riferimenti alle fonti ufficiali."
        }
    }
}

pub fn no_grounded_answer(locale: Locale) -> &'static str {
    match locale {
        Locale::En => {
            "I could not find an official source that supports an answer to this question, so I \
             won't answer it. Please consult the official publications or a qualified lawyer."
        }
        Locale::De => {
            "Ich habe keine amtliche Quelle gefunden, die eine Antwort auf diese Frage stützt, \
             und beantworte sie deshalb nicht. Bitte konsultieren Sie die amtlichen \
             Publikationen oder eine Fachperson."
        }
        Locale::Fr => {
            "Je n'ai trouvé aucune source officielle permettant de répondre à cette question; je \
             ne vais donc pas y répondre. Veuillez consulter les publications officielles ou un \
             avocat qualifié."
        }
        Locale::It => {
            "Non ho trovato alcuna fonte ufficiale a sostegno di una risposta a questa domanda, \
             quindi non rispondo. Consulti le pubblicazioni ufficiali o un avvocato qualificato."
        }
    }
}
