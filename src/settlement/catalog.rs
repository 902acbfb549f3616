//! Bill-payment catalog
//!
//! Categories group providers, providers offer services. The catalog is
//! read-only once built; [`Catalog::default`] is the built-in set of taxes,
//! vehicle registration, fines and utilities.

use rust_decimal::Decimal;

use crate::types::{BankError, BankResult, Category, Provider, Service};

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    categories: Vec<Category>,
    providers: Vec<Provider>,
    services: Vec<Service>,
}

fn category(code: &str, name: &str, description: &str, display_order: u32) -> Category {
    Category {
        code: code.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        display_order,
        active: true,
    }
}

fn provider(code: &str, category: &str, name: &str, reference_format: &str) -> Provider {
    Provider {
        code: code.to_string(),
        category: category.to_string(),
        name: name.to_string(),
        requires_reference: true,
        reference_format: Some(reference_format.to_string()),
        active: true,
    }
}

/// Variable-amount service; `fee` and bounds in cents
fn service(
    code: &str,
    provider: &str,
    name: &str,
    fee_cents: i64,
    min_cents: Option<i64>,
    max_cents: Option<i64>,
) -> Service {
    Service {
        code: code.to_string(),
        provider: provider.to_string(),
        name: name.to_string(),
        fixed_amount: None,
        allows_variable_amount: true,
        min_amount: min_cents.map(|c| Decimal::new(c, 2)),
        max_amount: max_cents.map(|c| Decimal::new(c, 2)),
        fee: Decimal::new(fee_cents, 2),
        active: true,
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let categories = vec![
            category("IMPUESTOS", "Impuestos", "SRI and municipal taxes", 1),
            category("MATRICULA", "Matricula vehicular", "Vehicle registration and tax", 2),
            category("MULTAS", "Multas y facturas", "Traffic fines and telecom bills", 3),
            category("SERVICIOS", "Servicios basicos", "Electricity, water, phone and internet", 4),
        ];

        let providers = vec![
            provider("SRI", "IMPUESTOS", "Servicio de Rentas Internas", "RUC o cedula"),
            provider("MUNICIPIO_QUITO", "IMPUESTOS", "Municipio de Quito", "Clave catastral"),
            provider("SRI_VEHICULOS", "MATRICULA", "SRI impuesto vehicular", "Placa"),
            provider("ANT_MATRICULA", "MATRICULA", "ANT matriculacion", "Placa"),
            provider("ANT", "MULTAS", "Agencia Nacional de Transito", "Cedula o placa"),
            provider("AMT", "MULTAS", "Agencia Metropolitana de Transito", "Numero de citacion"),
            provider("CNT_FACTURAS", "MULTAS", "CNT facturacion", "Numero de factura"),
            provider("CLARO", "MULTAS", "Claro", "Numero de telefono"),
            provider("MOVISTAR", "MULTAS", "Movistar", "Numero de telefono"),
            provider("EEQ", "SERVICIOS", "Empresa Electrica Quito", "Numero de suministro"),
            provider("CNEL", "SERVICIOS", "CNEL EP", "Numero de suministro"),
            provider("EMAAP", "SERVICIOS", "EPMAPS Quito", "Numero de cuenta"),
            provider("INTERAGUA", "SERVICIOS", "Interagua Guayaquil", "Numero de contrato"),
            provider("ETAPA", "SERVICIOS", "ETAPA Cuenca", "Numero de cuenta"),
            provider("CNT", "SERVICIOS", "Corporacion Nacional de Telecomunicaciones", "Numero de telefono"),
        ];

        let services = vec![
            service("SRI_IVA", "SRI", "Declaracion de IVA", 100, Some(100), None),
            service("SRI_RENTA", "SRI", "Impuesto a la renta", 100, Some(100), None),
            service("QUITO_PREDIAL", "MUNICIPIO_QUITO", "Impuesto predial", 75, Some(100), Some(5_000_000)),
            service("QUITO_PATENTE", "MUNICIPIO_QUITO", "Patente municipal", 75, Some(100), Some(5_000_000)),
            service("IMP_VEHICULAR", "SRI_VEHICULOS", "Impuesto vehicular", 100, Some(100), Some(1_000_000)),
            service("MATRICULA_VEHICULAR", "ANT_MATRICULA", "Matricula vehicular", 100, Some(100), Some(500_000)),
            service("ANT_MULTA_TRANSITO", "ANT", "Multa de transito", 50, Some(100), Some(500_000)),
            service("AMT_CITACION", "AMT", "Citacion AMT", 50, Some(100), Some(500_000)),
            service("CNT_FACTURA", "CNT_FACTURAS", "Factura CNT", 35, Some(100), Some(200_000)),
            service("CLARO_FACTURA", "CLARO", "Factura Claro", 35, Some(100), Some(200_000)),
            service("MOVISTAR_FACTURA", "MOVISTAR", "Factura Movistar", 35, Some(100), Some(200_000)),
            service("EEQ_LUZ", "EEQ", "Luz electrica EEQ", 50, Some(100), Some(200_000)),
            service("CNEL_LUZ", "CNEL", "Luz electrica CNEL", 50, Some(100), Some(200_000)),
            service("EMAAP_AGUA", "EMAAP", "Agua potable Quito", 40, Some(100), Some(100_000)),
            service("INTERAGUA_AGUA", "INTERAGUA", "Agua potable Guayaquil", 40, Some(100), Some(100_000)),
            service("ETAPA_AGUA", "ETAPA", "Agua potable Cuenca", 40, Some(100), Some(100_000)),
            service("CNT_TELEFONO", "CNT", "Telefonia fija CNT", 35, Some(100), Some(100_000)),
            service("CNT_NET", "CNT", "Internet CNT", 35, Some(100), Some(100_000)),
        ];

        Self {
            categories,
            providers,
            services,
        }
    }
}

impl Catalog {
    /// Build a catalog, checking that every link points at a known code
    pub fn new(
        categories: Vec<Category>,
        providers: Vec<Provider>,
        services: Vec<Service>,
    ) -> BankResult<Self> {
        for provider in &providers {
            if !categories.iter().any(|c| c.code == provider.category) {
                return Err(BankError::validation(
                    "provider",
                    format!("{} refers to unknown category {}", provider.code, provider.category),
                ));
            }
        }
        for service in &services {
            if !providers.iter().any(|p| p.code == service.provider) {
                return Err(BankError::validation(
                    "service",
                    format!("{} refers to unknown provider {}", service.code, service.provider),
                ));
            }
            if !service.allows_variable_amount && service.fixed_amount.is_none() {
                return Err(BankError::validation(
                    "service",
                    format!("{} has neither a fixed nor a variable amount", service.code),
                ));
            }
        }
        Ok(Self {
            categories,
            providers,
            services,
        })
    }

    /// Active categories in display order
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> =
            self.categories.iter().filter(|c| c.active).cloned().collect();
        categories.sort_by_key(|c| c.display_order);
        categories
    }

    /// Active providers, optionally of one category
    pub fn providers(&self, category: Option<&str>) -> Vec<Provider> {
        self.providers
            .iter()
            .filter(|p| p.active)
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .cloned()
            .collect()
    }

    /// Active services, optionally of one provider
    pub fn services(&self, provider: Option<&str>) -> Vec<Service> {
        self.services
            .iter()
            .filter(|s| s.active)
            .filter(|s| provider.is_none_or(|p| s.provider.eq_ignore_ascii_case(p)))
            .cloned()
            .collect()
    }

    /// Service by code, active or not
    pub fn service(&self, code: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.code == code)
    }

    pub fn provider(&self, code: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.code == code)
    }
}
