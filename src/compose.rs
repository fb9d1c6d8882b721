// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Localized message composition.
//!
//! The operator notification is always written in Spanish. The
//! confirmation sent back to the visitor uses one of a closed set of
//! label bundles selected by [`Lang`], with Spanish as the fallback.

use crate::form::ContactForm;
use chrono::{DateTime, Utc};
use std::fmt::Write;

const SITE_URL: &str = "https://landofirm.com";

/// Supported confirmation languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lang {
    #[default]
    Es,
    En,
    Ca,
    Eu,
}

impl Lang {
    /// Resolve a lower-case language tag. Anything else, including
    /// upper-case variants, falls back to Spanish.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "en" => Self::En,
            "ca" => Self::Ca,
            "eu" => Self::Eu,
            _ => Self::Es,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
            Self::Ca => "ca",
            Self::Eu => "eu",
        }
    }

    pub fn labels(self) -> &'static Labels {
        match self {
            Self::Es => &ES,
            Self::En => &EN,
            Self::Ca => &CA,
            Self::Eu => &EU,
        }
    }
}

/// Fixed-shape bundle of confirmation strings for one language.
#[derive(Debug)]
pub struct Labels {
    pub subject: &'static str,
    pub greeting: &'static str,
    pub thanks: &'static str,
    pub response: &'static str,
    pub summary: &'static str,
    pub service: &'static str,
    pub message: &'static str,
    pub budget_section: &'static str,
    pub budget_range: &'static str,
    pub project_type: &'static str,
    pub complexity: &'static str,
    pub features: &'static str,
    pub timeline: &'static str,
    pub duration: &'static str,
    pub comments: &'static str,
    pub add_info: &'static str,
    pub regards: &'static str,
    pub team_name: &'static str,
    pub disclaimer: &'static str,
}

static ES: Labels = Labels {
    subject: "Lando — Hemos recibido tu mensaje",
    greeting: "Hola",
    thanks: "Gracias por contactar con Lando. Hemos recibido tu mensaje y nuestro equipo lo revisará en breve.",
    response: "Te responderemos lo antes posible, normalmente en menos de 24 horas.",
    summary: "Aquí tienes un resumen de lo que nos has enviado:",
    service: "Servicio",
    message: "Mensaje",
    budget_section: "Detalles del presupuesto estimado",
    budget_range: "Rango estimado",
    project_type: "Tipo de proyecto",
    complexity: "Complejidad",
    features: "Funcionalidades",
    timeline: "Plazo",
    duration: "Duración estimada",
    comments: "Comentarios",
    add_info: "Si necesitas añadir información adicional, puedes responder directamente a este email.",
    regards: "Un saludo,",
    team_name: "El equipo de Lando",
    disclaimer: "Esta es una confirmación automática. No respondas a este mensaje si no necesitas añadir información.",
};

static EN: Labels = Labels {
    subject: "Lando — We have received your message",
    greeting: "Hi",
    thanks: "Thank you for contacting Lando. We have received your message and our team will review it shortly.",
    response: "We will get back to you as soon as possible, typically within 24 hours.",
    summary: "Here is a summary of what you sent us:",
    service: "Service",
    message: "Message",
    budget_section: "Budget estimate details",
    budget_range: "Estimated range",
    project_type: "Project type",
    complexity: "Complexity",
    features: "Features",
    timeline: "Timeline",
    duration: "Estimated duration",
    comments: "Comments",
    add_info: "If you need to add any additional information, you can reply directly to this email.",
    regards: "Best regards,",
    team_name: "The Lando Team",
    disclaimer: "This is an automatic confirmation. Please do not reply to this message if you do not need to add information.",
};

static CA: Labels = Labels {
    subject: "Lando — Hem rebut el teu missatge",
    greeting: "Hola",
    thanks: "Gràcies per contactar amb Lando. Hem rebut el teu missatge i el nostre equip el revisarà en breu.",
    response: "Et respondrem el més aviat possible, normalment en menys de 24 hores.",
    summary: "Aquí tens un resum del que ens has enviat:",
    service: "Servei",
    message: "Missatge",
    budget_section: "Detalls del pressupost estimat",
    budget_range: "Rang estimat",
    project_type: "Tipus de projecte",
    complexity: "Complexitat",
    features: "Funcionalitats",
    timeline: "Termini",
    duration: "Durada estimada",
    comments: "Comentaris",
    add_info: "Si necessites afegir informació addicional, pots respondre directament a aquest email.",
    regards: "Una salutació,",
    team_name: "L'equip de Lando",
    disclaimer: "Aquesta és una confirmació automàtica. No responguis a aquest missatge si no necessites afegir informació.",
};

static EU: Labels = Labels {
    subject: "Lando — Zure mezua jaso dugu",
    greeting: "Kaixo",
    thanks: "Eskerrik asko Landorekin harremanetan jartzeagatik. Zure mezua jaso dugu eta gure taldeak laster berrikusiko du.",
    response: "Ahalik eta azkarren erantzungo dizugu, normalean 24 ordutan.",
    summary: "Hona hemen bidali diguzunaren laburpena:",
    service: "Zerbitzua",
    message: "Mezua",
    budget_section: "Aurrekontu estimatuaren xehetasunak",
    budget_range: "Estimatutako tartea",
    project_type: "Proiektu mota",
    complexity: "Konplexutasuna",
    features: "Funtzionalitateak",
    timeline: "Epea",
    duration: "Estimatutako iraupena",
    comments: "Iruzkinak",
    add_info: "Informazio gehigarria gehitu behar baduzu, zuzenean erantzun dezakezu email honi.",
    regards: "Agur bero bat,",
    team_name: "Lando taldea",
    disclaimer: "Hau baieztapen automatikoa da. Ez erantzun mezu honi informazioa gehitu behar ez baduzu.",
};

/// Subject of the operator notification.
pub fn notification_subject(form: &ContactForm) -> String {
    if form.service.is_empty() {
        format!("Nuevo contacto: {}", form.name)
    } else {
        format!("Nuevo contacto: {} ({})", form.name, form.service)
    }
}

/// Body of the operator notification.
///
/// Optional fields only produce a line when they are non-empty. The
/// estimator block is written only when an estimate was submitted.
pub fn notification_body(form: &ContactForm, client_ip: &str, received_at: DateTime<Utc>) -> String {
    let mut b = String::new();
    b.push_str("Nueva consulta desde landofirm.com\n");
    b.push_str("====================================\n\n");
    let _ = writeln!(b, "Nombre: {}", form.name);
    let _ = writeln!(b, "Email: {}", form.email);
    for (label, value) in [
        ("Empresa", &form.company),
        ("Servicio", &form.service),
        ("Presupuesto", &form.budget),
        ("Plazo", &form.timeline),
    ] {
        if !value.is_empty() {
            let _ = writeln!(b, "{label}: {value}");
        }
    }
    let _ = writeln!(b, "\nMensaje:\n{}", form.message);

    if form.has_budget_estimate() {
        b.push_str("\n--- Datos del estimador ---\n");
        let _ = writeln!(b, "Rango estimado: {}", form.budget_estimate);
        let _ = writeln!(b, "Tipo proyecto: {}", form.budget_project);
        let _ = writeln!(b, "Complejidad: {}", form.budget_complexity);
        let _ = writeln!(b, "Funcionalidades: {}", form.budget_features);
        let _ = writeln!(b, "Plazo: {}", form.budget_timeline);
        let _ = writeln!(b, "Duración: {}", form.budget_duration);
        if !form.budget_comments.is_empty() {
            let _ = writeln!(b, "Comentarios: {}", form.budget_comments);
        }
    }

    b.push_str("\n--- Metadatos ---\n");
    let _ = writeln!(b, "Idioma: {}", form.lang);
    let _ = writeln!(b, "IP: {client_ip}");
    let _ = writeln!(b, "Fecha: {}", received_at.format("%Y-%m-%d %H:%M:%S UTC"));
    b
}

/// Subject of the visitor confirmation, tagged with the estimate if any.
pub fn confirmation_subject(form: &ContactForm) -> String {
    let subject = Lang::from_tag(&form.lang).labels().subject;
    if form.has_budget_estimate() {
        format!("{subject} [{}]", form.budget_estimate)
    } else {
        subject.to_string()
    }
}

/// Body of the visitor confirmation in the form's language.
pub fn confirmation_body(form: &ContactForm) -> String {
    let s = Lang::from_tag(&form.lang).labels();
    let mut b = String::new();

    let _ = write!(b, "{} {},\n\n", s.greeting, form.name);
    let _ = write!(b, "{}\n\n", s.thanks);
    let _ = write!(b, "{}\n\n", s.response);
    let _ = write!(b, "{}\n\n", s.summary);
    let _ = writeln!(b, "- {}: {}", s.service, value_or_dash(&form.service));
    let _ = writeln!(b, "- {}: {}", s.message, form.message);

    if form.has_budget_estimate() {
        let _ = write!(b, "\n--- {} ---\n\n", s.budget_section);
        let _ = writeln!(b, "  {}: {}", s.budget_range, form.budget_estimate);
        for (label, value) in [
            (s.project_type, &form.budget_project),
            (s.complexity, &form.budget_complexity),
            (s.features, &form.budget_features),
            (s.timeline, &form.budget_timeline),
            (s.duration, &form.budget_duration),
            (s.comments, &form.budget_comments),
        ] {
            if !value.is_empty() {
                let _ = writeln!(b, "  {label}: {value}");
            }
        }
    }

    let _ = write!(b, "\n{}\n\n", s.add_info);
    let _ = write!(b, "{}\n{}\n{SITE_URL}\n\n", s.regards, s.team_name);
    let _ = writeln!(b, "---\n{}", s.disclaimer);
    b
}

fn value_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
