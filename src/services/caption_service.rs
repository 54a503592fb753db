// src/services/caption_service.rs

use rust_decimal::Decimal;

use crate::models::{
    caption::{Caption, CaptionTone, SocialPlatform},
    property::{PipelineKind, Property},
    settings::AgencySettings,
};

const ELLIPSIS: char = '…';

/// "R$ 1.234.567,89"
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let raw = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, frac_part)
}

fn format_area(area: Decimal) -> String {
    format!("{} m²", area.normalize().to_string().replace('.', ","))
}

fn hashtag(raw: &str) -> Option<String> {
    let tag: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    (!tag.is_empty()).then(|| format!("#{}", tag))
}

/// Hashtags a partir de tipo, bairro, cidade e funil, sem repetição.
pub fn hashtags_for(property: &Property) -> Vec<String> {
    let deal = match property.pipeline {
        PipelineKind::Sale => "imovelavenda",
        PipelineKind::Rental => "imovelparaalugar",
    };

    let candidates = [
        Some("imoveis"),
        Some(deal),
        Some(property.property_type.as_str()),
        property.neighborhood.as_deref(),
        property.city.as_deref(),
    ];

    let mut tags: Vec<String> = Vec::new();
    for tag in candidates.into_iter().flatten().filter_map(hashtag) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

// Seções da legenda. As opcionais saem nesta ordem quando o texto não cabe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Headline,
    Location,
    Price,
    Features,
    Highlights,
    Description,
    CallToAction,
    Footer,
    Hashtags,
}

const DROP_ORDER: [Section; 5] = [
    Section::Description,
    Section::Highlights,
    Section::Hashtags,
    Section::Features,
    Section::Location,
];

fn headline(property: &Property, tone: CaptionTone) -> String {
    let deal = match property.pipeline {
        PipelineKind::Sale => "à venda",
        PipelineKind::Rental => "para alugar",
    };
    match tone {
        CaptionTone::Casual => format!("✨ {} {}!", property.title, deal),
        CaptionTone::Formal => format!("{} {}.", property.title, deal),
    }
}

fn location(property: &Property) -> Option<String> {
    let parts: Vec<&str> = [property.neighborhood.as_deref(), property.city.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    (!parts.is_empty()).then(|| format!("📍 {}", parts.join(", ")))
}

fn price(property: &Property) -> Option<String> {
    property.price.map(|value| match property.pipeline {
        PipelineKind::Sale => format!("💰 {}", format_brl(value)),
        PipelineKind::Rental => format!("💰 {}/mês", format_brl(value)),
    })
}

fn features(property: &Property) -> Option<String> {
    let plural = |n: i32, one: &str, many: &str| format!("{} {}", n, if n == 1 { one } else { many });

    let mut parts = Vec::new();
    if let Some(n) = property.bedrooms.filter(|n| *n > 0) {
        parts.push(format!("🛏 {}", plural(n, "quarto", "quartos")));
    }
    if let Some(n) = property.bathrooms.filter(|n| *n > 0) {
        parts.push(format!("🛁 {}", plural(n, "banheiro", "banheiros")));
    }
    if let Some(n) = property.parking_spots.filter(|n| *n > 0) {
        parts.push(format!("🚗 {}", plural(n, "vaga", "vagas")));
    }
    if let Some(area) = property.area_m2.filter(|a| *a > Decimal::ZERO) {
        parts.push(format!("📐 {}", format_area(area)));
    }
    (!parts.is_empty()).then(|| parts.join(" | "))
}

fn highlights(property: &Property) -> Option<String> {
    let lines: Vec<String> = property
        .highlights
        .iter()
        .filter(|h| !h.trim().is_empty())
        .map(|h| format!("• {}", h.trim()))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn call_to_action(platform: SocialPlatform, tone: CaptionTone, settings: &AgencySettings) -> String {
    let base = match (platform, tone) {
        (SocialPlatform::Whatsapp, _) => "Responda esta mensagem para agendar sua visita.".to_string(),
        (SocialPlatform::Instagram, CaptionTone::Casual) => "Gostou? Chama no direct e agende sua visita! 📲".to_string(),
        (_, CaptionTone::Casual) => "Gostou? Fale com a gente e agende sua visita!".to_string(),
        (_, CaptionTone::Formal) => "Entre em contato para mais informações e agendamento de visitas.".to_string(),
    };
    match settings.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(phone) if platform != SocialPlatform::Whatsapp => format!("{}\n📞 {}", base, phone),
        _ => base,
    }
}

fn footer(settings: &AgencySettings) -> Option<String> {
    let company = settings.company_name.as_deref().filter(|s| !s.trim().is_empty());
    let creci = settings.creci.as_deref().filter(|s| !s.trim().is_empty());
    match (company, creci) {
        (Some(company), Some(creci)) => Some(format!("{} | {}", company, creci)),
        (Some(company), None) => Some(company.to_string()),
        (None, Some(creci)) => Some(creci.to_string()),
        (None, None) => None,
    }
}

fn assemble(sections: &[(Section, String)], dropped: &[Section]) -> String {
    sections
        .iter()
        .filter(|(s, _)| !dropped.contains(s))
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_chars(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Monta a legenda de uma rede, respeitando o limite de caracteres dela.
pub fn build_caption(
    property: &Property,
    settings: &AgencySettings,
    platform: SocialPlatform,
    tone: CaptionTone,
) -> Caption {
    let tags = if platform.uses_hashtags() { hashtags_for(property) } else { Vec::new() };

    let mut sections: Vec<(Section, String)> = vec![(Section::Headline, headline(property, tone))];
    let optional = [
        (Section::Location, location(property)),
        (Section::Price, price(property)),
        (Section::Features, features(property)),
        (Section::Highlights, highlights(property)),
        (Section::Description, property.description.clone().filter(|d| !d.trim().is_empty())),
        (Section::CallToAction, Some(call_to_action(platform, tone, settings))),
        (Section::Footer, footer(settings)),
        (Section::Hashtags, (!tags.is_empty()).then(|| tags.join(" "))),
    ];
    sections.extend(optional.into_iter().filter_map(|(s, text)| text.map(|t| (s, t))));

    let max = platform.max_chars();
    let mut dropped: Vec<Section> = Vec::new();
    let mut text = assemble(&sections, &dropped);

    for section in DROP_ORDER {
        if text.chars().count() <= max {
            break;
        }
        dropped.push(section);
        text = assemble(&sections, &dropped);
    }

    let truncated = text.chars().count() > max;
    if truncated {
        text = truncate_chars(&text, max);
    }

    let hashtags = if dropped.contains(&Section::Hashtags) { Vec::new() } else { tags };
    let char_count = text.chars().count();

    Caption { platform, tone, text, hashtags, char_count, truncated }
}

/// Uma legenda por rede pedida, todas no mesmo tom.
pub fn generate_captions(
    property: &Property,
    settings: &AgencySettings,
    platforms: &[SocialPlatform],
    tone: CaptionTone,
) -> Vec<Caption> {
    let mut seen = Vec::with_capacity(platforms.len());
    platforms
        .iter()
        .copied()
        .filter(|p| {
            let first = !seen.contains(p);
            seen.push(*p);
            first
        })
        .map(|platform| build_caption(property, settings, platform, tone))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::Stage;
    use chrono::Utc;
    use std::str::FromStr;
    use uuid::Uuid;

    fn money(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn property() -> Property {
        Property {
            id: Uuid::new_v4(),
            code: "AP-1024".into(),
            title: "Apartamento 3 quartos com varanda".into(),
            pipeline: PipelineKind::Sale,
            stage: Stage::EmAnuncio,
            property_type: "Apartamento".into(),
            neighborhood: Some("Pinheiros".into()),
            city: Some("São Paulo".into()),
            bedrooms: Some(3),
            bathrooms: Some(1),
            parking_spots: Some(2),
            area_m2: Some(money("98.50")),
            price: Some(money("850000")),
            description: Some("Andar alto, sol da manhã.".into()),
            highlights: vec!["Varanda gourmet".into(), "Próximo ao metrô".into()],
            owner_name: None,
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn settings() -> AgencySettings {
        AgencySettings {
            company_name: Some("Imobiliária Horizonte".into()),
            creci: Some("CRECI-J 45678".into()),
            phone: Some("(11) 99999-8888".into()),
            ..Default::default()
        }
    }

    #[test]
    fn brl_uses_dot_thousands_and_comma_cents() {
        assert_eq!(format_brl(money("850000")), "R$ 850.000,00");
        assert_eq!(format_brl(money("1234567.891")), "R$ 1.234.567,89");
        assert_eq!(format_brl(money("999.5")), "R$ 999,50");
        assert_eq!(format_brl(money("0")), "R$ 0,00");
        assert_eq!(format_brl(money("-1500")), "-R$ 1.500,00");
    }

    #[test]
    fn hashtags_are_normalized_and_unique() {
        let mut p = property();
        p.city = Some("Pinheiros".into());
        assert_eq!(
            hashtags_for(&p),
            vec!["#imoveis", "#imovelavenda", "#apartamento", "#pinheiros"]
        );
    }

    #[test]
    fn caption_carries_price_features_and_footer() {
        let caption = build_caption(&property(), &settings(), SocialPlatform::Instagram, CaptionTone::Casual);

        assert!(caption.text.contains("R$ 850.000,00"));
        assert!(caption.text.contains("3 quartos"));
        assert!(caption.text.contains("1 banheiro "));
        assert!(caption.text.contains("98,5 m²"));
        assert!(caption.text.contains("• Varanda gourmet"));
        assert!(caption.text.contains("Imobiliária Horizonte | CRECI-J 45678"));
        assert!(caption.text.contains("#sãopaulo"));
        assert!(!caption.truncated);
        assert_eq!(caption.char_count, caption.text.chars().count());
    }

    #[test]
    fn whatsapp_has_no_hashtags() {
        let caption = build_caption(&property(), &settings(), SocialPlatform::Whatsapp, CaptionTone::Formal);
        assert!(caption.hashtags.is_empty());
        assert!(!caption.text.contains('#'));
    }

    #[test]
    fn rental_price_is_monthly() {
        let mut p = property();
        p.pipeline = PipelineKind::Rental;
        p.price = Some(money("3200"));
        let caption = build_caption(&p, &settings(), SocialPlatform::Facebook, CaptionTone::Formal);
        assert!(caption.text.contains("R$ 3.200,00/mês"));
        assert!(caption.text.contains("para alugar"));
    }

    #[test]
    fn long_description_is_dropped_before_cutting() {
        let mut p = property();
        p.description = Some("Lorem ipsum ".repeat(120));

        let caption = build_caption(&p, &settings(), SocialPlatform::Whatsapp, CaptionTone::Casual);

        assert!(caption.char_count <= SocialPlatform::Whatsapp.max_chars());
        assert!(!caption.truncated);
        assert!(!caption.text.contains("Lorem"));
        assert!(caption.text.contains("R$ 850.000,00"));
    }

    #[test]
    fn oversized_required_text_is_truncated() {
        let mut p = property();
        p.title = "Casa ".repeat(300);

        let caption = build_caption(&p, &settings(), SocialPlatform::Whatsapp, CaptionTone::Casual);

        assert!(caption.truncated);
        assert_eq!(caption.char_count, SocialPlatform::Whatsapp.max_chars());
        assert!(caption.text.ends_with(ELLIPSIS));
    }

    #[test]
    fn one_caption_per_requested_platform() {
        let captions = generate_captions(
            &property(),
            &settings(),
            &[SocialPlatform::Instagram, SocialPlatform::Whatsapp, SocialPlatform::Instagram],
            CaptionTone::Formal,
        );
        let platforms: Vec<SocialPlatform> = captions.iter().map(|c| c.platform).collect();
        assert_eq!(platforms, vec![SocialPlatform::Instagram, SocialPlatform::Whatsapp]);
        assert!(captions.iter().all(|c| c.tone == CaptionTone::Formal));
    }
}
