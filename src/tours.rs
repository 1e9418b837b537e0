use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use spdlog::{info, warn};

use crate::content::slug::short_slug;
use crate::context::{AppContext, Notifier};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, SetOptions};

pub const TOURS_COLLECTION: &str = "config";
pub const TOURS_DOCUMENT: &str = "tours";

const TOUR_ID_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub id: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
    pub cities: &'static [&'static str],
}

pub const COUNTRIES: [Country; 3] = [
    Country {
        id: "argentina",
        name: "Argentina",
        flag: "🇦🇷",
        cities: &["buenos-aires", "el-calafate", "el-chalten", "iguazu", "mendoza", "ushuaia", "rosario"],
    },
    Country {
        id: "espana",
        name: "España",
        flag: "🇪🇸",
        cities: &["madrid", "barcelona", "sevilla", "granada", "valencia", "bilbao"],
    },
    Country {
        id: "mexico",
        name: "México",
        flag: "🇲🇽",
        cities: &["cdmx", "cancun", "oaxaca", "guadalajara", "merida", "san-miguel"],
    },
];

pub fn find_country(id: &str) -> Option<&'static Country> {
    COUNTRIES.iter().find(|c| c.id == id)
}

/// An affiliate tour as stored in `config/tours`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: String,
    #[serde(rename = "pais")]
    pub country: String,
    #[serde(rename = "ciudad")]
    pub city: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "precio", default)]
    pub price: String,
    #[serde(rename = "duracion", default)]
    pub duration: String,
    #[serde(rename = "imagen", default)]
    pub image: String,
    #[serde(rename = "linkAfiliado", alias = "link", default)]
    pub affiliate_link: String,
    #[serde(rename = "activo", default = "active")]
    pub active: bool,
}

fn active() -> bool {
    true
}

/// What the user types in the tour form.
#[derive(Debug, Clone, Default)]
pub struct TourDraft {
    pub title: String,
    pub city: String,
    pub price: String,
    pub duration: String,
    pub image: String,
    pub affiliate_link: String,
}

impl TourDraft {
    fn into_tour(self, country: &Country) -> Result<Tour> {
        let title = self.title.trim().to_string();
        let city = self.city.trim().to_string();
        if title.is_empty() || city.is_empty() {
            return Err(Error::Validation(vec!["Title and city are required".to_string()]));
        }
        if !country.cities.contains(&city.as_str()) {
            return Err(Error::Validation(vec![format!("{} is not a city of {}", city, country.name)]));
        }

        Ok(Tour {
            id: short_slug(&title, TOUR_ID_LEN),
            country: country.id.to_string(),
            city,
            title,
            price: self.price.trim().to_string(),
            duration: self.duration.trim().to_string(),
            image: self.image.trim().to_string(),
            affiliate_link: self.affiliate_link.trim().to_string(),
            active: true,
        })
    }
}

/// Tours of every country. Each change writes the whole catalog back.
pub struct TourCatalog {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    tours: BTreeMap<&'static str, Vec<Tour>>,
}

impl TourCatalog {
    pub async fn load(ctx: &AppContext) -> Result<TourCatalog> {
        let mut catalog = TourCatalog {
            store: ctx.store.clone(),
            notifier: ctx.notifier.clone(),
            tours: COUNTRIES.iter().map(|c| (c.id, vec![])).collect(),
        };

        let doc = match ctx.store.get_document(TOURS_COLLECTION, TOURS_DOCUMENT).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Error loading tours: {}", e);
                catalog.notifier.error("Error loading tours");
                return Err(e);
            }
        };

        if let Some(mut doc) = doc {
            for country in COUNTRIES.iter() {
                let Some(value) = doc.remove(country.id) else {
                    continue;
                };
                let tours: Vec<Tour> = serde_json::from_value(value)?;
                catalog.tours.insert(country.id, tours);
            }
        }

        info!("Loaded {} tours", catalog.tours.values().map(Vec::len).sum::<usize>());
        Ok(catalog)
    }

    pub fn countries(&self) -> &'static [Country] {
        &COUNTRIES
    }

    pub fn tours(&self, country: &str) -> &[Tour] {
        self.tours.get(country).map(Vec::as_slice).unwrap_or_default()
    }

    /// Adds the tour, or replaces the one at `index`.
    pub async fn save_tour(&mut self, country: &str, index: Option<usize>, draft: TourDraft) -> Result<&Tour> {
        let country = country_of(country)?;
        let tour = match draft.into_tour(country) {
            Ok(tour) => tour,
            Err(e) => {
                self.notifier.error(&e.to_string());
                return Err(e);
            }
        };

        let mut tours = self.tours(country.id).to_vec();
        let pos = match index {
            Some(idx) if idx < tours.len() => {
                tours[idx] = tour;
                idx
            }
            Some(idx) => return Err(Error::invalid_input(format!("No tour {} in {}", idx, country.id))),
            None => {
                tours.push(tour);
                tours.len() - 1
            }
        };

        self.replace(country.id, tours).await?;
        self.notifier.success(if index.is_some() { "Tour updated" } else { "Tour created" });
        Ok(&self.tours[country.id][pos])
    }

    pub async fn delete_tour(&mut self, country: &str, index: usize) -> Result<Tour> {
        let country = country_of(country)?;
        let mut tours = self.tours(country.id).to_vec();
        if index >= tours.len() {
            return Err(Error::invalid_input(format!("No tour {} in {}", index, country.id)));
        }
        let removed = tours.remove(index);

        self.replace(country.id, tours).await?;
        self.notifier.success("Tour deleted");
        Ok(removed)
    }

    /// Replaces the tours of Argentina with the default list.
    pub async fn migrate_defaults(&mut self) -> Result<usize> {
        let tours = default_argentina_tours();
        let count = tours.len();
        self.replace("argentina", tours).await?;
        self.notifier.success(&format!("{} Argentina tours migrated", count));
        Ok(count)
    }

    async fn replace(&mut self, country: &'static str, tours: Vec<Tour>) -> Result<()> {
        let previous = self.tours.insert(country, tours);
        if let Err(e) = self.save().await {
            if let Some(previous) = previous {
                self.tours.insert(country, previous);
            }
            warn!("Error saving tours: {}", e);
            self.notifier.error("Error saving tours");
            return Err(e);
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let mut doc = Map::new();
        for (country, tours) in self.tours.iter() {
            doc.insert(country.to_string(), serde_json::to_value(tours)?);
        }
        self.store.set_document(TOURS_COLLECTION, TOURS_DOCUMENT, doc, SetOptions::merge()).await
    }
}

fn country_of(id: &str) -> Result<&'static Country> {
    find_country(id).ok_or_else(|| Error::invalid_input(format!("Unknown country {}", id)))
}

const DEFAULT_ARGENTINA: [(&str, &str, &str, &str, &str, &str, &str); 14] = [
    ("tango-cena", "buenos-aires", "Tour de Tango & Cena Show", "US$ 80", "4 horas",
     "1543167822-04c9955767f4", "buenos-aires/cena-tango-buenos-aires"),
    ("delta-tigre", "buenos-aires", "Navegación Delta del Tigre", "US$ 45", "Medio día",
     "1534234828563-0aa7cbed99b9", "buenos-aires/excursion-tigre-delta"),
    ("boca-juniors", "buenos-aires", "Experiencia Boca Juniors", "US$ 50", "3 horas",
     "1626025437642-0b05076ca301", "buenos-aires/tour-la-boca-san-telmo"),
    ("minitrekking", "el-calafate", "Minitrekking Perito Moreno", "US$ 250", "Día completo",
     "1518182170546-0766ce6fec56", "el-calafate/minitrekking-glaciar-perito-moreno"),
    ("todo-glaciares", "el-calafate", "Navegación Todo Glaciares", "US$ 180", "Día completo",
     "1464822759023-fed622ff2c3b", "el-calafate/paseo-barco-glaciares"),
    ("estancia-cristina", "el-calafate", "Estancia Cristina 4x4", "US$ 150", "Día completo",
     "1476514525535-07fb3b4ae5f1", "el-calafate/excursion-estancia-cristina"),
    ("fitz-roy", "el-chalten", "Trekking Guiado Fitz Roy", "US$ 90", "10 horas",
     "1589553416260-f586c8f1514f", "el-chalten/trekking-fitz-roy"),
    ("rafting-vueltas", "el-chalten", "Rafting Río de las Vueltas", "US$ 60", "4 horas",
     "1530866495561-507c9faab2ed", "el-chalten/rafting-rio-vueltas"),
    ("gran-aventura", "iguazu", "Gran Aventura (Gomón)", "US$ 70", "2 horas",
     "1582234032483-29479b18752c", "cataratas-iguazu/cataratas-argentina"),
    ("lado-brasileno", "iguazu", "Tour Lado Brasileño", "US$ 45", "Medio día",
     "1534069873406-80512803b9b0", "cataratas-iguazu/cataratas-brasil"),
    ("bodegas-lujan", "mendoza", "Tour Bodegas Luján", "US$ 110", "Día completo",
     "1516594915697-87eb3b1c14ea", "mendoza/tour-bodega-mendoza"),
    ("alta-montana", "mendoza", "Alta Montaña", "US$ 65", "Día completo",
     "1621257492476-c4d370150993", "mendoza/excursion-alta-montana"),
    ("canal-beagle", "ushuaia", "Navegación Canal Beagle", "US$ 70", "3 horas",
     "1548291673-30541797c552", "ushuaia/paseo-barco-canal-beagle"),
    ("laguna-esmeralda", "ushuaia", "Trekking Laguna Esmeralda", "US$ 80", "6 horas",
     "1478131143081-80f7f84ca84d", "ushuaia/trekking-laguna-esmeralda"),
];

pub fn default_argentina_tours() -> Vec<Tour> {
    DEFAULT_ARGENTINA.iter()
        .map(|(id, city, title, price, duration, photo, page)| Tour {
            id: id.to_string(),
            country: "argentina".to_string(),
            city: city.to_string(),
            title: title.to_string(),
            price: price.to_string(),
            duration: duration.to_string(),
            image: format!("https://images.unsplash.com/photo-{}?auto=format&fit=crop&w=600&q=80", photo),
            affiliate_link: format!("https://www.civitatis.com/es/{}/?aid=12345", page),
            active: true,
        })
        .collect()
}

/// `buenos-aires` -> `Buenos Aires`
pub fn city_label(city: &str) -> String {
    city.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
